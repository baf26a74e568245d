// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod map;
pub mod wellness;

pub use activity::{ActivityRecord, ActivityType, ActivityWrite, StoredActivity, TypeMapping};
pub use map::{MapDocument, Route};
pub use wellness::WellnessRecord;
