//! Coarse endpoint groupings used for bulk invalidation after writes.

/// A group of endpoints that are invalidated together.
///
/// An endpoint belongs to a family when its path contains the family marker
/// anywhere, so `/clients/7/jobs` belongs to both `Clients` and `Jobs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceFamily {
  Business,
  Jobs,
  Clients,
  Invoices,
}

impl ResourceFamily {
  pub const ALL: [ResourceFamily; 4] = [
    ResourceFamily::Business,
    ResourceFamily::Jobs,
    ResourceFamily::Clients,
    ResourceFamily::Invoices,
  ];

  /// Path fragment that marks membership in this family.
  pub fn marker(self) -> &'static str {
    match self {
      Self::Business => "/business",
      Self::Jobs => "/jobs",
      Self::Clients => "/clients",
      Self::Invoices => "/invoices",
    }
  }

  /// All families the endpoint belongs to, in declaration order.
  pub fn classify(endpoint: &str) -> Vec<ResourceFamily> {
    Self::ALL
      .into_iter()
      .filter(|family| endpoint.contains(family.marker()))
      .collect()
  }
}

/// True when the two family sets have at least one member in common.
pub fn shares_family(a: &[ResourceFamily], b: &[ResourceFamily]) -> bool {
  a.iter().any(|family| b.contains(family))
}
