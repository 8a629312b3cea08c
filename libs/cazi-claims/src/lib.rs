#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Typed claim accessors.
//!
//! A [`Claims`] bag is a JSON object. A [`Claim<T>`] binds a key (or a key
//! path into nested objects) to a Rust type and reads or writes that slot
//! without ever failing loudly:
//!
//! - a missing key, an absent bag, a broken path or a value of another type
//!   all read as `None`
//! - writing into an absent bag, or through a path blocked by a non-object
//!   value, does nothing
//!
//! ```
//! use cazi_claims::{Claim, Claims};
//!
//! let city: Claim<String> = Claim::nested(["address", "city"]);
//! let mut claims = Claims::new();
//!
//! city.set(&mut claims, "Paris".to_owned());
//! assert_eq!(city.get(&claims).as_deref(), Some("Paris"));
//! ```

pub mod claim;
pub mod standard;

pub use claim::{Claim, ClaimPathError, Claims, get_claim, set_claim};
pub use standard::StandardClaims;
