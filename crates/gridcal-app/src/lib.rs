// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod date;
pub mod events;
pub mod ids;
pub mod picker;
pub mod selection;
pub mod state;

pub use date::*;
pub use events::*;
pub use ids::*;
pub use picker::*;
pub use selection::*;
pub use state::*;
