//! Output generation: the daily JSON snapshot and the HTML page.
//!
//! # Submodules
//!
//! - [`snapshot`]: writes and reads the dated `news_<date>.json` files
//! - [`html`]: turns a [`GroupedView`](crate::models::GroupedView) into a page
//!
//! # Output Structure
//!
//! ```text
//! data_dir/
//! ├── news_2025-05-06.json
//! ├── news_2025-05-06.meta.json
//! └── news_2025-05-07.json
//! ```

pub mod html;
pub mod snapshot;
