//! # hopscotch-map
//!
//! An associative container built on hopscotch hashing: an
//! open-addressed scheme where every key lives within a small, bounded
//! neighborhood of its home bucket (`hash(key) % table_size`). Unlike
//! linear or quadratic probing, a lookup never has to chase an
//! unbounded probe sequence. It scans at most H slots, where H is the
//! table's neighborhood width (8, 16, 32, or 64, chosen so that
//! `H >= ceil(log2(table_size))`).
//!
//! Insertion that can't place a key directly in its home's
//! neighborhood displaces existing entries backwards along the probe
//! sequence (see `free_up` in the private `engine` module) rather than
//! growing the table immediately; growth only happens when that
//! displacement search exhausts the neighborhood, or when the load
//! factor crosses 80%.
//!
//! ## Example
//!
//! ```rust
//! use hopscotch_map::HopscotchMap;
//!
//! let mut map: HopscotchMap<String, String> = HopscotchMap::new();
//! map.set("key1".to_string(), "value1".to_string());
//! map.set("key2".to_string(), "value2".to_string());
//!
//! assert_eq!(map.get(&"key1".to_string()).unwrap(), "value1");
//! assert!(map.contains(&"key2".to_string()));
//!
//! map.remove(&"key1".to_string()).unwrap();
//! assert!(!map.contains(&"key1".to_string()));
//! ```
//!
//! Building from a known key/value set up front goes through
//! [`HopscotchMapBuilder`]:
//!
//! ```rust
//! use hopscotch_map::HopscotchMapBuilder;
//!
//! let map = HopscotchMapBuilder::new()
//!     .insert("a", 1)
//!     .insert("b", 2)
//!     .build();
//!
//! assert_eq!(map.get(&"a").unwrap(), &1);
//! ```

pub mod error;
pub mod map;

mod engine;
mod neighborhood;
mod slots;

pub use error::HopscotchError;
pub use map::{HopscotchMap, HopscotchMapBuilder};
