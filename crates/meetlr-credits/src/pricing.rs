// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel credit costs.

use meetlr_config::model::CreditsConfig;
use meetlr_core::ServiceType;

/// Credits charged for one message on `service`.
pub fn credit_cost(service: ServiceType, config: &CreditsConfig) -> i64 {
    match service {
        ServiceType::Email => config.email_cost,
        ServiceType::Sms => config.sms_cost,
        ServiceType::WhatsApp => config.whatsapp_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn costs_follow_config() {
        let config = CreditsConfig {
            email_cost: 1,
            sms_cost: 3,
            whatsapp_cost: 2,
        };
        assert_eq!(credit_cost(ServiceType::Email, &config), 1);
        assert_eq!(credit_cost(ServiceType::Sms, &config), 3);
        assert_eq!(credit_cost(ServiceType::WhatsApp, &config), 2);
    }
}
