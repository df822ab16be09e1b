// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking state transitions.
//!
//! Each transition validates first and mutates only on success, returning
//! the single [`LifecycleEvent`] it raised. A rejected transition leaves the
//! booking untouched and raises nothing.

use chrono::{DateTime, Utc};
use meetlr_core::{
    Booking, BookingError, BookingStatus, LifecycleDetail, LifecycleEvent, PaymentStatus,
};
use serde::{Deserialize, Serialize};

use crate::policy::BookingPolicy;

/// Input for creating a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub tenant_id: String,
    pub meetlr_event_id: String,
    pub host_user_id: String,
    pub title: String,
    pub attendee_name: String,
    pub attendee_email: String,
    pub attendee_phone: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price_cents: Option<i64>,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    pub location_type: Option<String>,
    pub auto_calendar_sync: bool,
    pub sms_reminders: bool,
    pub whatsapp_reminders: bool,
}

impl NewBooking {
    /// Build the booking in its initial state.
    ///
    /// Priced bookings start `Pending` awaiting payment; free bookings start
    /// `Pending` with no payment required and can be confirmed at once.
    pub fn into_booking(self, now: DateTime<Utc>) -> Result<(Booking, LifecycleEvent), BookingError> {
        if self.end_time <= self.start_time {
            return Err(BookingError::InvalidTimeRange);
        }
        let priced = self.price_cents.is_some_and(|p| p > 0);
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: self.tenant_id,
            meetlr_event_id: self.meetlr_event_id,
            host_user_id: self.host_user_id,
            title: self.title,
            attendee_name: self.attendee_name,
            attendee_email: self.attendee_email,
            attendee_phone: self.attendee_phone,
            start_time: self.start_time,
            end_time: self.end_time,
            status: BookingStatus::Pending,
            price_cents: self.price_cents,
            currency: self.currency,
            payment_status: if priced {
                PaymentStatus::Pending
            } else {
                PaymentStatus::NotRequired
            },
            payment_intent_id: self.payment_intent_id,
            location_type: self.location_type,
            meeting_url: None,
            meeting_id: None,
            calendar_event_id: None,
            calendar_schedule_id: None,
            auto_calendar_sync: self.auto_calendar_sync,
            sms_reminders: self.sms_reminders,
            whatsapp_reminders: self.whatsapp_reminders,
            reschedule_count: 0,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };
        let event = LifecycleEvent::new(&booking, LifecycleDetail::Created, now);
        Ok((booking, event))
    }
}

/// Lifecycle transitions on the booking aggregate.
pub trait BookingLifecycle {
    /// `Pending -> Confirmed`. Priced bookings need a completed payment.
    fn confirm(&mut self, now: DateTime<Utc>) -> Result<LifecycleEvent, BookingError>;

    /// Any non-terminal state `-> Cancelled`.
    fn cancel(
        &mut self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LifecycleEvent, BookingError>;

    /// Move a confirmed booking to a new window, at most
    /// `policy.max_reschedules` times and never inside the notice window.
    fn reschedule(
        &mut self,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        now: DateTime<Utc>,
        policy: &BookingPolicy,
    ) -> Result<LifecycleEvent, BookingError>;
}

impl BookingLifecycle for Booking {
    fn confirm(&mut self, now: DateTime<Utc>) -> Result<LifecycleEvent, BookingError> {
        match self.status {
            BookingStatus::Pending => {}
            BookingStatus::Cancelled => return Err(BookingError::AlreadyCancelled(self.id.clone())),
            other => {
                return Err(BookingError::InvalidTransition {
                    id: self.id.clone(),
                    from: other.to_string(),
                    to: BookingStatus::Confirmed.to_string(),
                });
            }
        }
        if self.is_priced() && self.payment_status != PaymentStatus::Completed {
            return Err(BookingError::PaymentIncomplete(self.id.clone()));
        }

        self.status = BookingStatus::Confirmed;
        self.updated_at = now;
        Ok(LifecycleEvent::new(self, LifecycleDetail::Completed, now))
    }

    fn cancel(
        &mut self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LifecycleEvent, BookingError> {
        if self.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(self.id.clone()));
        }

        let payment_involved = self.payment_status == PaymentStatus::Completed;
        self.status = BookingStatus::Cancelled;
        self.cancellation_reason = reason.clone();
        self.updated_at = now;
        Ok(LifecycleEvent::new(
            self,
            LifecycleDetail::Cancelled {
                reason,
                payment_involved,
            },
            now,
        ))
    }

    fn reschedule(
        &mut self,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        now: DateTime<Utc>,
        policy: &BookingPolicy,
    ) -> Result<LifecycleEvent, BookingError> {
        match self.status {
            BookingStatus::Confirmed => {}
            BookingStatus::Cancelled => return Err(BookingError::AlreadyCancelled(self.id.clone())),
            other => {
                return Err(BookingError::InvalidTransition {
                    id: self.id.clone(),
                    from: other.to_string(),
                    to: "rescheduled".to_string(),
                });
            }
        }
        if self.reschedule_count >= policy.max_reschedules {
            return Err(BookingError::AlreadyRescheduled {
                id: self.id.clone(),
                count: self.reschedule_count,
            });
        }
        if new_end <= new_start {
            return Err(BookingError::InvalidTimeRange);
        }
        if new_start - now <= policy.reschedule_notice {
            return Err(BookingError::WithinNoticeWindow {
                id: self.id.clone(),
                notice_hours: policy.reschedule_notice.num_hours(),
            });
        }

        let (old_start, old_end) = (self.start_time, self.end_time);
        self.start_time = new_start;
        self.end_time = new_end;
        self.reschedule_count += 1;
        self.updated_at = now;
        Ok(LifecycleEvent::new(
            self,
            LifecycleDetail::Rescheduled {
                old_start,
                old_end,
                new_start,
                new_end,
            },
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use meetlr_core::LifecycleKind;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
    }

    fn new_booking(price: Option<i64>) -> NewBooking {
        NewBooking {
            tenant_id: "tenant".into(),
            meetlr_event_id: "ev".into(),
            host_user_id: "host".into(),
            title: "Consult".into(),
            attendee_name: "Ada".into(),
            attendee_email: "ada@example.com".into(),
            attendee_phone: None,
            start_time: now() + Duration::days(10),
            end_time: now() + Duration::days(10) + Duration::hours(1),
            price_cents: price,
            currency: "usd".into(),
            payment_intent_id: price.map(|_| "pi_1".to_string()),
            location_type: None,
            auto_calendar_sync: false,
            sms_reminders: false,
            whatsapp_reminders: false,
        }
    }

    fn confirmed() -> Booking {
        let (mut b, _) = new_booking(None).into_booking(now()).unwrap();
        b.confirm(now()).unwrap();
        b
    }

    #[test]
    fn create_emits_created_and_rejects_inverted_range() {
        let (b, ev) = new_booking(Some(5000)).into_booking(now()).unwrap();
        assert_eq!(ev.kind(), LifecycleKind::Created);
        assert_eq!(b.status, BookingStatus::Pending);
        assert_eq!(b.payment_status, PaymentStatus::Pending);

        let mut bad = new_booking(None);
        bad.end_time = bad.start_time;
        assert_eq!(bad.into_booking(now()).unwrap_err(), BookingError::InvalidTimeRange);
    }

    #[test]
    fn priced_booking_needs_payment_before_confirm() {
        let (mut b, _) = new_booking(Some(5000)).into_booking(now()).unwrap();
        assert!(matches!(b.confirm(now()), Err(BookingError::PaymentIncomplete(_))));
        assert_eq!(b.status, BookingStatus::Pending);

        b.payment_status = PaymentStatus::Completed;
        let ev = b.confirm(now()).unwrap();
        assert_eq!(ev.kind(), LifecycleKind::Completed);
        assert_eq!(b.status, BookingStatus::Confirmed);
    }

    #[test]
    fn confirming_twice_is_invalid() {
        let mut b = confirmed();
        assert!(matches!(
            b.confirm(now()),
            Err(BookingError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn cancelling_twice_fails_without_event() {
        let mut b = confirmed();
        let ev = b.cancel(Some("conflict".into()), now()).unwrap();
        assert!(matches!(
            ev.detail,
            LifecycleDetail::Cancelled {
                payment_involved: false,
                ..
            }
        ));
        assert_eq!(b.cancellation_reason.as_deref(), Some("conflict"));

        let before = b.clone();
        assert_eq!(
            b.cancel(None, now()).unwrap_err(),
            BookingError::AlreadyCancelled(b.id.clone())
        );
        assert_eq!(b, before);
    }

    #[test]
    fn cancel_flags_completed_payment() {
        let (mut b, _) = new_booking(Some(5000)).into_booking(now()).unwrap();
        b.payment_status = PaymentStatus::Completed;
        let ev = b.cancel(None, now()).unwrap();
        assert!(matches!(
            ev.detail,
            LifecycleDetail::Cancelled {
                payment_involved: true,
                ..
            }
        ));
    }

    #[test]
    fn reschedule_at_most_once() {
        let policy = BookingPolicy::default();
        let mut b = confirmed();
        let start = now() + Duration::days(20);
        let ev = b
            .reschedule(start, start + Duration::hours(1), now(), &policy)
            .unwrap();
        match ev.detail {
            LifecycleDetail::Rescheduled {
                old_start,
                new_start,
                ..
            } => {
                assert_eq!(old_start, now() + Duration::days(10));
                assert_eq!(new_start, start);
            }
            other => panic!("unexpected detail {other:?}"),
        }
        assert_eq!(b.reschedule_count, 1);

        let second = b.reschedule(
            start + Duration::days(1),
            start + Duration::days(1) + Duration::hours(1),
            now(),
            &policy,
        );
        assert!(matches!(second, Err(BookingError::AlreadyRescheduled { count: 1, .. })));
        assert_eq!(b.start_time, start);
    }

    #[test]
    fn reschedule_inside_notice_window_is_rejected() {
        let policy = BookingPolicy::default();
        let mut b = confirmed();
        let before = b.clone();
        let start = now() + Duration::hours(71);
        let err = b
            .reschedule(start, start + Duration::hours(1), now(), &policy)
            .unwrap_err();
        assert!(matches!(err, BookingError::WithinNoticeWindow { notice_hours: 72, .. }));
        assert_eq!(b, before);

        // Exactly at the boundary is still inside the window.
        let edge = now() + Duration::hours(72);
        assert!(b.reschedule(edge, edge + Duration::hours(1), now(), &policy).is_err());
    }

    #[test]
    fn cancelled_booking_cannot_be_rescheduled() {
        let mut b = confirmed();
        b.cancel(None, now()).unwrap();
        let start = now() + Duration::days(30);
        assert!(matches!(
            b.reschedule(start, start + Duration::hours(1), now(), &BookingPolicy::default()),
            Err(BookingError::AlreadyCancelled(_))
        ));
    }
}
