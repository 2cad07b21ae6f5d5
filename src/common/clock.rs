// src/common/clock.rs

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

/// Clock shared by services that stamp or expire records.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub fn system_clock() -> SharedClock {
    Arc::new(DefaultClock)
}
