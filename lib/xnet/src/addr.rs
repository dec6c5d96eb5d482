// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The address plan: pairwise-disjoint block assignment.
//!
//! There is no partial success here. Either every requested block is
//! disjoint from every other, or the check fails naming *every*
//! offending pair — a human fixing a plan wants the whole list at
//! once, not one collision per attempt.

use crate::api::DiagKind;
use crate::api::Diagnostic;
use crate::api::IpCidr;
use alloc::vec::Vec;
use itertools::Itertools;

/// Check that the given labeled blocks are pairwise disjoint.
///
/// Returns one `Conflict` diagnostic per overlapping pair, in the
/// order the blocks were declared.
pub fn check_disjoint(blocks: &[(&str, IpCidr)]) -> Vec<Diagnostic> {
    blocks
        .iter()
        .tuple_combinations()
        .filter(|((_, a), (_, b))| a.overlaps(b))
        .map(|((name_a, a), (name_b, b))| {
            Diagnostic::new(
                DiagKind::Conflict,
                format!("{name_a} ({a}) overlaps {name_b} ({b})"),
            )
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::vec::Vec;

    fn blocks(specs: &[(&'static str, &str)]) -> Vec<(&'static str, IpCidr)> {
        specs.iter().map(|(n, c)| (*n, c.parse().unwrap())).collect()
    }

    #[test]
    fn disjoint_blocks_pass() {
        let blocks = blocks(&[
            ("environment azure", "10.0.0.0/16"),
            ("environment aws", "10.1.0.0/16"),
        ]);
        assert!(check_disjoint(&blocks).is_empty());
    }

    #[test]
    fn overlap_names_both_sides() {
        let blocks = blocks(&[
            ("environment azure", "10.0.0.0/16"),
            ("environment aws", "10.0.0.0/16"),
        ]);

        let diags = check_disjoint(&blocks);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagKind::Conflict);
        assert!(diags[0].message.contains("environment azure"));
        assert!(diags[0].message.contains("environment aws"));
        assert!(diags[0].message.contains("10.0.0.0/16"));
    }

    #[test]
    fn every_offending_pair_reported() {
        // A /8 supernet collides with both /16s below it; the /16s are
        // disjoint from one another. Expect exactly the two pairs.
        let blocks = blocks(&[
            ("a", "10.0.0.0/8"),
            ("b", "10.0.0.0/16"),
            ("c", "10.1.0.0/16"),
        ]);

        let diags = check_disjoint(&blocks);
        assert_eq!(diags.len(), 2);
        assert!(diags[0].message.contains("a (10.0.0.0/8)"));
        assert!(diags[0].message.contains("b (10.0.0.0/16)"));
        assert!(diags[1].message.contains("a (10.0.0.0/8)"));
        assert!(diags[1].message.contains("c (10.1.0.0/16)"));
    }
}
