// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

mod types;
mod util;
pub mod io;
mod picture;
mod frame;
mod conversion;
mod encoder;
mod output;
mod pipeline;
pub use types::*;
pub use util::select_custom_option;
pub use picture::*;
pub use frame::*;
pub use conversion::*;
pub use encoder::*;
pub use output::*;
pub use pipeline::*;
