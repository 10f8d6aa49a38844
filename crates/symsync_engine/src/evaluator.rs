//! Conflict evaluation strategies.

use symsync_store::Claim;

/// Picks the winning claim for a signature out of every known claim
/// across all authors.
///
/// Evaluation is a single, global decision per signature, not a
/// per-author one. Implementations must return a claim for the same
/// signature they were given; the engine treats a changed signature as a
/// fatal policy bug.
pub trait ConflictEvaluator: Send + Sync {
    /// Returns the winning claim, or `None` to resolve the signature to
    /// its pristine name.
    fn winner(&self, claims: &[Claim]) -> Option<Claim>;
}

/// The default policy: the claim with the maximum timestamp wins,
/// regardless of author.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxTimestamp;

impl ConflictEvaluator for MaxTimestamp {
    fn winner(&self, claims: &[Claim]) -> Option<Claim> {
        claims.iter().max_by_key(|claim| claim.timestamp).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symsync_protocol::SymbolKind;

    fn claim(author: &str, name: &str, timestamp: i64) -> Claim {
        Claim {
            author: author.into(),
            kind: SymbolKind::Method,
            canonical_signature: "sig1".into(),
            name: Some(name.into()),
            timestamp,
        }
    }

    #[test]
    fn newest_claim_wins_across_authors() {
        let claims = vec![claim("a", "foo", 10), claim("b", "bar", 20)];
        let winner = MaxTimestamp.winner(&claims).unwrap();
        assert_eq!(winner.name.as_deref(), Some("bar"));
        assert_eq!(winner.author, "b");
    }

    #[test]
    fn empty_set_has_no_winner() {
        assert!(MaxTimestamp.winner(&[]).is_none());
    }

    #[test]
    fn tombstone_can_win() {
        let mut claims = vec![claim("a", "foo", 10)];
        claims.push(Claim {
            author: "b".into(),
            kind: SymbolKind::Method,
            canonical_signature: "sig1".into(),
            name: None,
            timestamp: 30,
        });

        let winner = MaxTimestamp.winner(&claims).unwrap();
        assert!(winner.is_tombstone());
    }
}
