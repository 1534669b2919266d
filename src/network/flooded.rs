//! Flooded-node overrides from depression filling.
//!
//! Flooded nodes behave as perfect sediment traps for one erosion call:
//! no capacity, no erosion, everything arriving is deposited.

use crate::error::{Result, SedDepError};

/// Flooded nodes as supplied by a lake filler.
#[derive(Clone, Debug, PartialEq)]
pub enum FloodedNodes {
    /// One flag per node.
    Mask(Vec<bool>),
    /// Ids of flooded nodes.
    Ids(Vec<usize>),
}

impl FloodedNodes {
    /// Write the flooded flags into a dense per-node mask.
    ///
    /// `mask` is cleared first. Fails if the mask has the wrong length or an
    /// id is out of range.
    pub fn resolve_into(&self, mask: &mut [bool]) -> Result<()> {
        let n_nodes = mask.len();
        mask.fill(false);
        match self {
            Self::Mask(flags) => {
                if flags.len() != n_nodes {
                    return Err(SedDepError::shape_mismatch(
                        "flooded_nodes",
                        n_nodes,
                        flags.len(),
                    ));
                }
                mask.copy_from_slice(flags);
            }
            Self::Ids(ids) => {
                for &node in ids {
                    if node >= n_nodes {
                        return Err(SedDepError::InvalidFloodedNode { node, n_nodes });
                    }
                    mask[node] = true;
                }
            }
        }
        Ok(())
    }

    /// Number of flooded nodes.
    pub fn count(&self) -> usize {
        match self {
            Self::Mask(flags) => flags.iter().filter(|&&f| f).count(),
            Self::Ids(ids) => ids.len(),
        }
    }
}

impl From<Vec<bool>> for FloodedNodes {
    fn from(mask: Vec<bool>) -> Self {
        Self::Mask(mask)
    }
}

impl From<Vec<usize>> for FloodedNodes {
    fn from(ids: Vec<usize>) -> Self {
        Self::Ids(ids)
    }
}
