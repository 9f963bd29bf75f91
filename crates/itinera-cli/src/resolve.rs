//! Short-id resolution.
//!
//! Commands print the first eight characters of each UUID. [`resolve_id`]
//! accepts either a full UUID or any unambiguous prefix of one of the
//! candidate ids.

use anyhow::{Result, bail};
use uuid::Uuid;

/// Width of the short ids printed by the CLI.
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: Uuid) -> String {
    id.to_string()[..SHORT_ID_LEN].to_string()
}

/// Resolve `input` against `candidates`.
///
/// A full UUID is returned as-is even if it is not among the candidates, so
/// the store can report whether it is missing or someone else's. `kind` names
/// the thing being resolved in error messages ("plan", "activity").
pub fn resolve_id(input: &str, candidates: &[Uuid], kind: &str) -> Result<Uuid> {
    let input = input.trim();
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }
    if input.is_empty() {
        bail!("empty {kind} id");
    }

    let needle = input.to_ascii_lowercase();
    let matches: Vec<Uuid> = candidates
        .iter()
        .copied()
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no {kind} matches id {input:?}"),
        many => bail!(
            "{kind} id {input:?} is ambiguous ({} matches); use more characters",
            many.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn full_uuid_passes_through() {
        let u = Uuid::new_v4();
        assert_eq!(resolve_id(&u.to_string(), &[], "plan").unwrap(), u);
    }

    #[test]
    fn unique_prefix_resolves() {
        let a = id("a1b2c3d4-0000-4000-8000-000000000001");
        let b = id("b1b2c3d4-0000-4000-8000-000000000002");
        assert_eq!(resolve_id("A1B2", &[a, b], "plan").unwrap(), a);
        assert_eq!(resolve_id(&short_id(b), &[a, b], "plan").unwrap(), b);
    }

    #[test]
    fn ambiguous_and_unknown_prefixes_fail() {
        let a = id("a1b2c3d4-0000-4000-8000-000000000001");
        let b = id("a1b2ffff-0000-4000-8000-000000000002");

        let err = resolve_id("a1b2", &[a, b], "activity").unwrap_err();
        assert!(err.to_string().contains("ambiguous"), "{err}");

        let err = resolve_id("zz", &[a, b], "activity").unwrap_err();
        assert!(err.to_string().contains("no activity matches"), "{err}");

        assert!(resolve_id("  ", &[a], "plan").is_err());
    }

    #[test]
    fn short_id_is_eight_chars() {
        let u = id("a1b2c3d4-0000-4000-8000-000000000001");
        assert_eq!(short_id(u), "a1b2c3d4");
    }
}
