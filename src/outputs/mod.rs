//! Output generation for operator-facing cycle reports.
//!
//! # Output Structure
//!
//! ```text
//! report_dir/
//! ├── 2025-05-06_093000.md   # one report per cycle
//! └── 2025-05-06_110000.md
//! ```

pub mod markdown;
