//! Core types and traits shared by every index strategy.
//!
//! - **Values**: [`Shape`], [`Filter`]
//! - **Aggregates**: [`CountingFilter`] (reference-counted OR)
//! - **Contract**: [`FilterIndex`]
//! - **Sizing**: [`params`] for deriving a shape from an expected population
//!
//! # Module Organization
//!
//! ```text
//! core/
//! ├── shape.rs     - Width + hash count
//! ├── filter.rs    - Filter value type and its four primitives
//! ├── counting.rs  - Counting aggregate filter
//! ├── index.rs     - FilterIndex trait
//! ├── params.rs    - Optimal m/k calculations
//! └── mod.rs       - This file (public API)
//! ```
//!
//! # Ownership Model
//!
//! Indexes are single-threaded containers. Mutating operations take
//! `&mut self`; queries take `&self`. Share an index across threads by
//! wrapping it in a lock, or query it concurrently through `&` once it is
//! fully built.
//!
//! # Examples
//!
//! ```
//! use bloomindex::core::{Filter, FilterIndex, Shape};
//! use bloomindex::index::LinearIndex;
//!
//! let shape = Shape::new(20, 3).unwrap();
//! let mut index = LinearIndex::new(shape);
//!
//! let a = Filter::from_words(shape, vec![0b1_0011]).unwrap();
//! let b = Filter::from_words(shape, vec![0b1_0111]).unwrap();
//! index.add(a.clone());
//! index.add(b);
//!
//! assert_eq!(index.count(&a), 2);
//! ```

pub mod counting;
pub mod filter;
pub mod index;
pub mod params;
pub mod shape;

pub use counting::CountingFilter;
pub use filter::{Filter, DEFAULT_LOG_DEPTH};
pub use index::FilterIndex;
pub use shape::Shape;

#[cfg(feature = "rayon")]
pub use index::par_count_batch;
