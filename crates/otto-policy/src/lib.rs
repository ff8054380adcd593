//! Pure policy: notification gating (spec §4.B) and schedule transition
//! (spec §4.C). No I/O, no clock reads — every function takes `now`
//! explicitly so it is trivially unit-testable.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod clock_math;
mod effective_profile;
mod gate;
mod transition;

pub use clock_math::{local_clock_minutes, local_date_key, minutes_in_window, next_local_time_at, parse_hhmm};
pub use effective_profile::{is_profile_onboarding_complete, resolve_effective_profile, EffectiveProfile};
pub use gate::{resolve_gate_decision, GateAction, GateDecision, GateReason};
pub use transition::{resolve_schedule_transition, ScheduleTransition, TransitionError};
