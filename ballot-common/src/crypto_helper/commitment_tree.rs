use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto_helper::{PoseidonHashError, PoseidonHasher};
use crate::entities::{FieldElement, LeafRecord};
use crate::StdResult;

/// [IncrementalCommitmentTree] related errors.
#[derive(Debug, Error)]
pub enum CommitmentTreeError {
    /// No leaf exists at the requested position.
    #[error("leaf index {index} is out of range, the tree has {leaf_count} leaves")]
    IndexOutOfRange {
        /// Requested leaf position
        index: u64,
        /// Number of leaves in the tree
        leaf_count: usize,
    },

    /// The leaf log has a gap or a duplicated index, it is incomplete or corrupted.
    #[error("leaf log is not contiguous: expected index {expected}, found {found}")]
    InvalidLeafSequence {
        /// Index that should have come next
        expected: u64,
        /// Index actually found
        found: u64,
    },

    /// Zero is reserved to mark missing siblings and can not be a leaf.
    #[error("leaf at index {index} is zero")]
    ZeroLeaf {
        /// Position of the zero leaf
        index: u64,
    },

    /// The compression function failed.
    #[error(transparent)]
    Hash(#[from] PoseidonHashError),
}

/// Inclusion proof of a leaf: one sibling per tree level, from the leaves up to the root.
///
/// A zero sibling means that the node had no sibling at this level and was lifted unchanged,
/// hence zero padding at the end of the siblings does not change the computed root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleInclusionProof {
    /// Proven leaf
    pub leaf: FieldElement,

    /// Position of the proven leaf
    pub index: u64,

    /// Siblings of the path, from the leaf level up
    pub siblings: Vec<FieldElement>,

    /// Root of the tree the proof was generated from
    pub root: FieldElement,
}

impl MerkleInclusionProof {
    /// Recompute the root from the leaf and the siblings.
    ///
    /// At level `l` the bit `l` of the leaf index tells if the current node is a right child.
    pub fn compute_root(&self) -> Result<FieldElement, PoseidonHashError> {
        let mut hasher = PoseidonHasher::new()?;
        let mut node = self.leaf;

        for (level, sibling) in self.siblings.iter().enumerate() {
            if sibling.is_zero() {
                continue;
            }
            let is_right_child = level < u64::BITS as usize && (self.index >> level) & 1 == 1;
            node = if is_right_child {
                hasher.hash2(sibling, &node)?
            } else {
                hasher.hash2(&node, sibling)?
            };
        }

        Ok(node)
    }

    /// Verification of the proof against its root
    pub fn verify(&self) -> StdResult<()> {
        let computed_root = self.compute_root()?;

        (computed_root == self.root)
            .then_some(())
            .ok_or(anyhow!(
                "Invalid inclusion proof: computed root '{computed_root}' differs from '{}'",
                self.root
            ))
    }
}

/// Append-only binary Merkle tree over the Poseidon compression, rebuilt from the ordered
/// registration leaves.
///
/// Conventions shared with the vote circuit:
/// * a node without right sibling is lifted unchanged to the next level,
/// * the depth is the smallest `d` such that `2^d >= leaf count`, a lone leaf is its own root,
/// * the root of an empty tree is zero.
pub struct IncrementalCommitmentTree {
    // `nodes[0]` holds the leaves and `nodes[depth]` holds the root.
    nodes: Vec<Vec<FieldElement>>,
    hasher: PoseidonHasher,
}

impl IncrementalCommitmentTree {
    /// Create an empty tree
    pub fn new() -> Result<Self, CommitmentTreeError> {
        Ok(Self {
            nodes: vec![vec![]],
            hasher: PoseidonHasher::new()?,
        })
    }

    /// Build a tree from leaves already ordered by position.
    pub fn build(leaves: &[FieldElement]) -> Result<Self, CommitmentTreeError> {
        let mut tree = Self::new()?;
        tree.insert_many(leaves)?;

        Ok(tree)
    }

    /// Build a tree from registration records received in any order.
    ///
    /// The records are sorted by index, which must be unique and contiguous from 0.
    pub fn from_leaf_records(records: &[LeafRecord]) -> Result<Self, CommitmentTreeError> {
        let mut sorted_records = records.to_vec();
        sorted_records.sort_by_key(|record| record.index);

        for (expected, record) in (0u64..).zip(sorted_records.iter()) {
            if record.index != expected {
                return Err(CommitmentTreeError::InvalidLeafSequence {
                    expected,
                    found: record.index,
                });
            }
        }

        let leaves: Vec<FieldElement> = sorted_records.iter().map(|r| r.value).collect();
        Self::build(&leaves)
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        self.nodes[0].len()
    }

    /// Number of levels above the leaves
    pub fn depth(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Root of the tree, zero if the tree is empty
    pub fn root(&self) -> FieldElement {
        self.nodes[self.depth()]
            .first()
            .copied()
            .unwrap_or_else(FieldElement::zero)
    }

    /// Leaf at the given position
    pub fn leaf(&self, index: u64) -> Option<FieldElement> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.nodes[0].get(index).copied())
    }

    /// Append a leaf, updating only the nodes of its path.
    pub fn insert(&mut self, leaf: FieldElement) -> Result<(), CommitmentTreeError> {
        let mut index = self.leaf_count();
        if leaf.is_zero() {
            return Err(CommitmentTreeError::ZeroLeaf {
                index: index as u64,
            });
        }

        if (1usize << self.depth()) < index + 1 {
            self.nodes.push(vec![]);
        }

        let mut node = leaf;
        for level in 0..self.depth() {
            Self::set_node(&mut self.nodes[level], index, node);
            if index & 1 == 1 {
                let left_sibling = self.nodes[level][index - 1];
                node = self.hasher.hash2(&left_sibling, &node)?;
            }
            index >>= 1;
        }
        let depth = self.depth();
        self.nodes[depth] = vec![node];

        Ok(())
    }

    /// Append leaves in order.
    pub fn insert_many(&mut self, leaves: &[FieldElement]) -> Result<(), CommitmentTreeError> {
        for leaf in leaves {
            self.insert(*leaf)?;
        }

        Ok(())
    }

    /// Generate the inclusion proof of the leaf at the given position.
    ///
    /// The proof has exactly [depth][Self::depth] siblings.
    pub fn prove_inclusion(&self, index: u64) -> Result<MerkleInclusionProof, CommitmentTreeError> {
        let leaf = self
            .leaf(index)
            .ok_or(CommitmentTreeError::IndexOutOfRange {
                index,
                leaf_count: self.leaf_count(),
            })?;

        let mut position = index as usize;
        let mut siblings = Vec::with_capacity(self.depth());
        for level in 0..self.depth() {
            let sibling_position = if position & 1 == 1 {
                position - 1
            } else {
                position + 1
            };
            siblings.push(
                self.nodes[level]
                    .get(sibling_position)
                    .copied()
                    .unwrap_or_else(FieldElement::zero),
            );
            position >>= 1;
        }

        Ok(MerkleInclusionProof {
            leaf,
            index,
            siblings,
            root: self.root(),
        })
    }

    fn set_node(level_nodes: &mut Vec<FieldElement>, index: usize, node: FieldElement) {
        if index < level_nodes.len() {
            level_nodes[index] = node;
        } else {
            level_nodes.push(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand_chacha::ChaCha20Rng;
    use rand_core::{RngCore, SeedableRng};

    use super::*;

    fn leaves(values: &[u64]) -> Vec<FieldElement> {
        values.iter().map(|v| FieldElement::from(*v)).collect()
    }

    fn leaf_records(count: u64) -> Vec<LeafRecord> {
        (0..count)
            .map(|index| LeafRecord::new(index, FieldElement::from(1000 + index * 7)))
            .collect()
    }

    fn shuffle<T>(items: &mut [T], rng: &mut ChaCha20Rng) {
        for i in (1..items.len()).rev() {
            let j = (rng.next_u64() % (i as u64 + 1)) as usize;
            items.swap(i, j);
        }
    }

    /// Level by level folding of the whole tree, used as a reference for the incremental one.
    fn reference_root(leaves: &[FieldElement]) -> FieldElement {
        let mut hasher = PoseidonHasher::new().unwrap();
        let mut level = leaves.to_vec();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hasher.hash2(left, right).unwrap(),
                    [lifted] => *lifted,
                    _ => unreachable!(),
                })
                .collect();
        }

        level.first().copied().unwrap_or_else(FieldElement::zero)
    }

    #[test]
    fn golden_root_of_two_leaves() {
        let tree = IncrementalCommitmentTree::build(&leaves(&[1, 2])).unwrap();

        assert_eq!(
            "7853200120776062878684798364095072458815029376092732009249414926327459813530",
            tree.root().to_string()
        );
        assert_eq!(1, tree.depth());
    }

    #[test]
    fn empty_tree_and_single_leaf_tree() {
        let empty = IncrementalCommitmentTree::new().unwrap();
        assert_eq!(FieldElement::zero(), empty.root());
        assert_eq!(0, empty.depth());

        let single = IncrementalCommitmentTree::build(&leaves(&[42])).unwrap();
        assert_eq!(FieldElement::from(42), single.root());
        assert_eq!(0, single.depth());
        assert!(single.prove_inclusion(0).unwrap().siblings.is_empty());
    }

    #[test]
    fn unpaired_node_is_lifted_unchanged() {
        let mut hasher = PoseidonHasher::new().unwrap();
        let tree = IncrementalCommitmentTree::build(&leaves(&[1, 2, 3])).unwrap();
        let left = hasher
            .hash2(&FieldElement::from(1), &FieldElement::from(2))
            .unwrap();

        assert_eq!(
            hasher.hash2(&left, &FieldElement::from(3)).unwrap(),
            tree.root()
        );
        assert_eq!(2, tree.depth());
    }

    #[test]
    fn incremental_root_matches_level_folding_for_many_sizes() {
        for size in 1..=33u64 {
            let values = leaves(&(1..=size).collect::<Vec<_>>());
            let tree = IncrementalCommitmentTree::build(&values).unwrap();

            assert_eq!(reference_root(&values), tree.root(), "tree of {size} leaves");
        }
    }

    #[test]
    fn root_does_not_depend_on_arrival_order() {
        let records = leaf_records(13);
        let expected_root = IncrementalCommitmentTree::from_leaf_records(&records)
            .unwrap()
            .root();
        let mut rng = ChaCha20Rng::from_seed([7u8; 32]);

        for _ in 0..10 {
            let mut shuffled = records.clone();
            shuffle(&mut shuffled, &mut rng);

            assert_eq!(
                expected_root,
                IncrementalCommitmentTree::from_leaf_records(&shuffled)
                    .unwrap()
                    .root(),
                "shuffled records: {shuffled:?}"
            );
        }
    }

    #[test]
    fn altering_any_leaf_changes_the_root() {
        let values = leaves(&[11, 22, 33, 44, 55, 66, 77]);
        let root = IncrementalCommitmentTree::build(&values).unwrap().root();

        for position in 0..values.len() {
            let mut altered = values.clone();
            altered[position] = FieldElement::from(999);

            assert_ne!(
                root,
                IncrementalCommitmentTree::build(&altered).unwrap().root(),
                "altering leaf {position} should change the root"
            );
        }
    }

    #[test]
    fn inclusion_proof_of_every_leaf_recomputes_the_root() {
        for size in 1..=17u64 {
            let tree =
                IncrementalCommitmentTree::build(&leaves(&(1..=size).collect::<Vec<_>>())).unwrap();

            for index in 0..size {
                let proof = tree.prove_inclusion(index).unwrap();

                assert_eq!(tree.depth(), proof.siblings.len());
                assert_eq!(tree.root(), proof.compute_root().unwrap());
                proof
                    .verify()
                    .unwrap_or_else(|e| panic!("proof of {index} in {size} leaves: {e}"));
            }
        }
    }

    #[test]
    fn zero_padding_does_not_change_the_recomputed_root() {
        let tree = IncrementalCommitmentTree::build(&leaves(&[5, 6, 7, 8, 9])).unwrap();
        let mut proof = tree.prove_inclusion(4).unwrap();
        proof.siblings.resize(16, FieldElement::zero());

        assert_eq!(tree.root(), proof.compute_root().unwrap());
    }

    #[test]
    fn tampered_inclusion_proof_is_rejected() {
        let tree = IncrementalCommitmentTree::build(&leaves(&[5, 6, 7, 8])).unwrap();
        let mut proof = tree.prove_inclusion(2).unwrap();
        proof.leaf = FieldElement::from(70);

        proof
            .verify()
            .expect_err("proof with a tampered leaf should be rejected");
    }

    #[test]
    fn prove_inclusion_out_of_range() {
        let tree = IncrementalCommitmentTree::build(&leaves(&[5, 6, 7])).unwrap();

        assert!(matches!(
            tree.prove_inclusion(3),
            Err(CommitmentTreeError::IndexOutOfRange {
                index: 3,
                leaf_count: 3
            })
        ));
    }

    #[test]
    fn leaf_records_with_a_gap_are_rejected() {
        let records = vec![
            LeafRecord::new(0, FieldElement::from(1)),
            LeafRecord::new(2, FieldElement::from(3)),
        ];

        assert!(matches!(
            IncrementalCommitmentTree::from_leaf_records(&records),
            Err(CommitmentTreeError::InvalidLeafSequence {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn leaf_records_with_a_duplicated_index_are_rejected() {
        let records = vec![
            LeafRecord::new(1, FieldElement::from(2)),
            LeafRecord::new(0, FieldElement::from(1)),
            LeafRecord::new(1, FieldElement::from(3)),
        ];

        assert!(matches!(
            IncrementalCommitmentTree::from_leaf_records(&records),
            Err(CommitmentTreeError::InvalidLeafSequence {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn leaf_records_not_starting_at_zero_are_rejected() {
        let records = vec![LeafRecord::new(1, FieldElement::from(2))];

        assert!(matches!(
            IncrementalCommitmentTree::from_leaf_records(&records),
            Err(CommitmentTreeError::InvalidLeafSequence {
                expected: 0,
                found: 1
            })
        ));
    }

    #[test]
    fn zero_leaf_is_rejected() {
        let mut tree = IncrementalCommitmentTree::build(&leaves(&[1, 2])).unwrap();

        assert!(matches!(
            tree.insert(FieldElement::zero()),
            Err(CommitmentTreeError::ZeroLeaf { index: 2 })
        ));
        assert_eq!(2, tree.leaf_count());
    }

    #[test]
    fn arrival_order_fixture_builds_the_tree_sorted_by_index() {
        let (v0, v1, v2) = (
            FieldElement::from(100),
            FieldElement::from(101),
            FieldElement::from(102),
        );
        let arrival_order = vec![
            LeafRecord::new(2, v2),
            LeafRecord::new(0, v0),
            LeafRecord::new(1, v1),
        ];

        let tree = IncrementalCommitmentTree::from_leaf_records(&arrival_order).unwrap();
        let proof = tree.prove_inclusion(1).unwrap();

        assert_eq!(
            IncrementalCommitmentTree::build(&[v0, v1, v2]).unwrap().root(),
            tree.root()
        );
        assert_eq!(v1, proof.leaf);
        assert_eq!(vec![v0, v2], proof.siblings);
        assert_eq!(tree.root(), proof.compute_root().unwrap());
    }
}
