//! Statistics helpers for tracking evolution progress.
//!
//! - [`descriptive`]: summary statistics (min, max, mean, median, spread) of
//!   a set of fitness values
//! - [`history`]: a fixed-capacity rolling history that drops its oldest
//!   entries on overflow
//!
//! # Examples
//!
//! ```
//! use runners_stats::{descriptive::DescriptiveStats, history::RollingHistory};
//!
//! let stats = DescriptiveStats::new([1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert_eq!(stats.mean, 3.0);
//!
//! let mut history = RollingHistory::new(2);
//! history.push(stats.max);
//! history.push(6.0);
//! history.push(7.0);
//! assert_eq!(history.iter().copied().collect::<Vec<_>>(), [6.0, 7.0]);
//! ```

pub mod descriptive;
pub mod history;
