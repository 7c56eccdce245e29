use voxnet_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{jurisdiction::JurisdictionError, spatial_address::SpatialAddress, types::NodeRole};

/// Where an address falls relative to a jurisdiction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Area {
    /// Strict ancestor of the jurisdiction root
    Above,
    Within,
    /// Inside a subtree carved out of the jurisdiction
    Delegated,
    Outside,
}

/// The region of the tree one server is authoritative for: everything at or
/// below `root`, minus the `delegated` subtrees. A map without a root is an
/// unknown jurisdiction and contains nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JurisdictionMap {
    role: NodeRole,
    root: Option<SpatialAddress>,
    delegated: Vec<SpatialAddress>,
}

impl JurisdictionMap {
    pub fn unknown(role: NodeRole) -> Self {
        Self {
            role,
            root: None,
            delegated: Vec::new(),
        }
    }

    pub fn whole_tree(role: NodeRole) -> Self {
        Self {
            role,
            root: Some(SpatialAddress::root()),
            delegated: Vec::new(),
        }
    }

    pub fn new(
        role: NodeRole,
        root: Option<SpatialAddress>,
        mut delegated: Vec<SpatialAddress>,
    ) -> Result<Self, JurisdictionError> {
        delegated.sort();

        match &root {
            None => {
                if !delegated.is_empty() {
                    return Err(JurisdictionError::DelegationWithoutRoot);
                }
            }
            Some(root) => {
                if let Some(stray) = delegated.iter().find(|addr| !root.is_ancestor_of(addr)) {
                    return Err(JurisdictionError::DelegatedNotDescendant {
                        root: root.clone(),
                        delegated: stray.clone(),
                    });
                }
                // sorted order places any descendant right after its ancestor
                for pair in delegated.windows(2) {
                    if pair[0].is_ancestor_or_equal(&pair[1]) {
                        return Err(JurisdictionError::OverlappingDelegation {
                            first: pair[0].clone(),
                            second: pair[1].clone(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            role,
            root,
            delegated,
        })
    }

    /// Builds a map from the hex octal-code form used in server configuration:
    /// `root_hex` is the jurisdiction root (empty means the whole tree) and
    /// `end_nodes` a comma separated list of delegated roots.
    pub fn from_hex_config(
        role: NodeRole,
        root_hex: &str,
        end_nodes: &str,
    ) -> Result<Self, JurisdictionError> {
        let root = if root_hex.trim().is_empty() {
            SpatialAddress::root()
        } else {
            SpatialAddress::from_hex(root_hex)?
        };

        let mut delegated = Vec::new();
        for part in end_nodes.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            delegated.push(SpatialAddress::from_hex(part)?);
        }

        Self::new(role, Some(root), delegated)
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn root(&self) -> Option<&SpatialAddress> {
        self.root.as_ref()
    }

    pub fn delegated(&self) -> &[SpatialAddress] {
        &self.delegated
    }

    pub fn is_known(&self) -> bool {
        self.root.is_some()
    }

    pub fn contains(&self, addr: &SpatialAddress) -> bool {
        self.classify(addr) == Area::Within
    }

    pub fn classify(&self, addr: &SpatialAddress) -> Area {
        let Some(root) = &self.root else {
            return Area::Outside;
        };

        if addr.is_ancestor_of(root) {
            return Area::Above;
        }
        if !root.is_ancestor_or_equal(addr) {
            return Area::Outside;
        }
        if self
            .delegated
            .iter()
            .any(|delegated| delegated.is_ancestor_or_equal(addr))
        {
            return Area::Delegated;
        }
        Area::Within
    }

    /// True if some address is contained by both maps.
    pub fn overlaps(&self, other: &JurisdictionMap) -> bool {
        match (&self.root, &other.root) {
            (Some(root), Some(other_root)) => self.contains(other_root) || other.contains(root),
            _ => false,
        }
    }
}

impl Serde for JurisdictionMap {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.role.ser(writer);
        self.root.ser(writer);
        self.delegated.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let role = NodeRole::de(reader)?;
        let root = Option::<SpatialAddress>::de(reader)?;
        let delegated = Vec::<SpatialAddress>::de(reader)?;
        Self::new(role, root, delegated).map_err(|_| SerdeErr)
    }

    fn bit_length(&self) -> u32 {
        self.role.bit_length() + self.root.bit_length() + self.delegated.bit_length()
    }
}
