//! Target host selection.
//!
//! Hosts are picked by explicit name, by tag (every requested tag must be
//! present), or both. Order follows the inventory for tag matches and the
//! command line for explicit names.

use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::error::ConfigError;

use super::spec::HostDescriptor;

/// Parses a comma separated tag list into a lowercased set.
#[must_use]
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Resolves the hosts a command should run against.
///
/// # Errors
///
/// Returns an error if an explicitly named host is unknown or if a tag
/// filter alone matches nothing.
pub fn resolve_targets(
    hosts: &[HostDescriptor],
    requested: &[String],
    tags: Option<&str>,
) -> Result<Vec<HostDescriptor>, ConfigError> {
    let required = tags.map(parse_tags).unwrap_or_default();

    let find = |name: &str| {
        hosts
            .iter()
            .find(|h| h.name == name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownHost {
                host: name.to_string(),
            })
    };

    if required.is_empty() && requested.is_empty() {
        return Ok(hosts.to_vec());
    }

    let tag_matched: Vec<HostDescriptor> = if required.is_empty() {
        Vec::new()
    } else {
        let matched: Vec<HostDescriptor> = hosts
            .iter()
            .filter(|h| required.is_subset(&h.tags))
            .cloned()
            .collect();
        debug!("{} hosts matched tags {:?}", matched.len(), required);
        if matched.is_empty() && requested.is_empty() {
            return Err(ConfigError::NoTagMatch {
                tags: tags.unwrap_or_default().to_string(),
            });
        }
        matched
    };

    // Tag matches first, then explicit hosts; a host appears once.
    let mut seen: HashSet<String> = HashSet::new();
    let mut targets = Vec::new();
    for host in tag_matched {
        if seen.insert(host.name.clone()) {
            targets.push(host);
        }
    }
    for name in requested {
        let host = find(name.as_str())?;
        if seen.insert(host.name.clone()) {
            targets.push(host);
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InventoryParser;

    fn hosts() -> Vec<HostDescriptor> {
        InventoryParser::new()
            .parse_yaml(
                r"
hosts:
  - name: sw1
    tags: [tokyo, ex]
  - name: sw2
    tags: [osaka, ex]
  - name: fw1
    tags: [Tokyo, srx]
",
                None,
            )
            .expect("parse failed")
            .resolve()
    }

    fn names(targets: &[HostDescriptor]) -> Vec<&str> {
        targets.iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn test_all_hosts_when_nothing_requested() {
        let targets = resolve_targets(&hosts(), &[], None).expect("resolve");
        assert_eq!(names(&targets), vec!["sw1", "sw2", "fw1"]);
    }

    #[test]
    fn test_explicit_hosts_keep_order() {
        let requested = vec![String::from("fw1"), String::from("sw1")];
        let targets = resolve_targets(&hosts(), &requested, None).expect("resolve");
        assert_eq!(names(&targets), vec!["fw1", "sw1"]);
    }

    #[test]
    fn test_repeated_host_is_targeted_once() {
        let requested = vec![
            String::from("sw2"),
            String::from("sw1"),
            String::from("sw2"),
        ];
        let targets = resolve_targets(&hosts(), &requested, None).expect("resolve");
        assert_eq!(names(&targets), vec!["sw2", "sw1"]);
    }

    #[test]
    fn test_unknown_host_is_error() {
        let requested = vec![String::from("nope")];
        assert!(matches!(
            resolve_targets(&hosts(), &requested, None),
            Err(ConfigError::UnknownHost { .. })
        ));
    }

    #[test]
    fn test_tags_are_anded_and_case_insensitive() {
        let targets = resolve_targets(&hosts(), &[], Some("TOKYO")).expect("resolve");
        assert_eq!(names(&targets), vec!["sw1", "fw1"]);

        let targets = resolve_targets(&hosts(), &[], Some("tokyo, ex")).expect("resolve");
        assert_eq!(names(&targets), vec!["sw1"]);
    }

    #[test]
    fn test_tag_without_match_is_error() {
        assert!(matches!(
            resolve_targets(&hosts(), &[], Some("nagoya")),
            Err(ConfigError::NoTagMatch { .. })
        ));
    }

    #[test]
    fn test_tags_union_hosts_deduplicated() {
        let requested = vec![String::from("sw2"), String::from("sw1")];
        let targets = resolve_targets(&hosts(), &requested, Some("tokyo")).expect("resolve");
        assert_eq!(names(&targets), vec!["sw1", "fw1", "sw2"]);
    }
}
