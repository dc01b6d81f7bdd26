//! Address parsing and expansion collaborators.
//!
//! The crate never parses or expands addresses itself. [`AddressBackend`] is
//! the seam; [`LibpostalBackend`] (feature `libpostal`) forwards to
//! libpostal through `libpostal-rs`.

use crate::error::{Error, Result};
use crate::types::ParsedComponent;

/// Parser and expander for free-form postal addresses.
pub trait AddressBackend {
    /// Split an address into labeled components, in input order.
    fn parse(&self, address: &str) -> Result<Vec<ParsedComponent>>;

    /// Produce normalized variants of an address. May be empty.
    fn expand(&self, address: &str) -> Result<Vec<String>>;
}

/// Backend used when the crate is built without libpostal.
///
/// Every call fails with a [`Error::Backend`] explaining how to enable it.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBackend;

impl AddressBackend for UnavailableBackend {
    fn parse(&self, _address: &str) -> Result<Vec<ParsedComponent>> {
        Err(unavailable())
    }

    fn expand(&self, _address: &str) -> Result<Vec<String>> {
        Err(unavailable())
    }
}

fn unavailable() -> Error {
    Error::backend("built without libpostal support; rebuild with `--features libpostal`")
}

/// Order components by where their value appears in the input.
///
/// libpostal lowercases component values, so matching is done on the
/// lowercased input. Components are first put in label order, so the result
/// does not depend on the order they arrive in. Each one then claims the
/// earliest occurrence of its value not already claimed by another, so a
/// repeated value lands on both of its positions. Values that cannot be
/// located sort last, in label order.
pub fn order_by_position(address: &str, mut components: Vec<ParsedComponent>) -> Vec<ParsedComponent> {
    let haystack = address.to_lowercase();
    components.sort_by(|a, b| {
        label_key(&a.label)
            .cmp(&label_key(&b.label))
            .then_with(|| a.value.cmp(&b.value))
    });

    let mut claimed = Vec::new();
    let mut positioned: Vec<(usize, ParsedComponent)> = components
        .into_iter()
        .map(|component| {
            let needle = component.value.to_lowercase();
            let position = if needle.is_empty() {
                None
            } else {
                haystack
                    .match_indices(needle.as_str())
                    .map(|(at, _)| at)
                    .find(|at| !claimed.contains(at))
            };
            if let Some(at) = position {
                claimed.push(at);
            }
            (position.unwrap_or(usize::MAX), component)
        })
        .collect();

    // stable: equal positions keep label order
    positioned.sort_by_key(|(position, _)| *position);
    positioned.into_iter().map(|(_, component)| component).collect()
}

/// Sort key for labels such as `road` or `other_12`, numbering `other_N` by value.
fn label_key(label: &str) -> (&str, Option<u32>) {
    match label.rsplit_once('_') {
        Some((prefix, n)) => match n.parse() {
            Ok(n) => (prefix, Some(n)),
            Err(_) => (label, None),
        },
        None => (label, None),
    }
}

#[cfg(feature = "libpostal")]
pub use self::libpostal::LibpostalBackend;

#[cfg(feature = "libpostal")]
mod libpostal {
    use super::{AddressBackend, order_by_position};
    use crate::error::{Error, Result};
    use crate::types::ParsedComponent;
    use libpostal_rs::LibPostal;
    use tracing::debug;

    /// libpostal-backed parser and expander.
    #[derive(Debug)]
    pub struct LibpostalBackend {
        postal: LibPostal,
    }

    impl LibpostalBackend {
        /// Initialize libpostal, downloading its data files on first use.
        pub async fn initialize() -> Result<Self> {
            let postal = LibPostal::new()
                .await
                .map_err(|e| Error::backend(e.to_string()))?;
            Ok(Self { postal })
        }
    }

    impl AddressBackend for LibpostalBackend {
        fn parse(&self, address: &str) -> Result<Vec<ParsedComponent>> {
            let parsed = self
                .postal
                .parse_address(address)
                .map_err(|e| Error::backend(e.to_string()))?;
            let components = parsed
                .components()
                .into_iter()
                .map(|(label, value)| ParsedComponent::new(value, label))
                .collect();
            let ordered = order_by_position(address, components);
            debug!(components = ordered.len(), "libpostal parse");
            Ok(ordered)
        }

        fn expand(&self, address: &str) -> Result<Vec<String>> {
            let normalized = self
                .postal
                .normalize_address(address)
                .map_err(|e| Error::backend(e.to_string()))?;
            debug!(expansions = normalized.len(), "libpostal expand");
            Ok(normalized.expansions)
        }
    }
}
