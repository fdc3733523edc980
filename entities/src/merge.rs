//! Merge engine for partial search results
//!
//! Backends answer independently and their clocks are not aligned, so the
//! coordinator cannot trust any ordering or grouping they send. A merge:
//!
//! 1. flattens every present result into entries carrying their identity
//! 2. stable-sorts the entries by timestamp, ascending
//! 3. clips to the result window, keeping the earliest or the latest entries
//! 4. recomputes `from`/`to` from what survived the clip
//! 5. regroups by identity, in first-seen order
//!
//! Ties keep arrival order: result index, then group order, then entry order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::request::SearchRequest;
use crate::response::{IdentityKey, LogEntry, LogMessage, LogResponseGroup, LogResponseList};

/// Default result window of a merged search
///
/// Known to be aggressive: with the default only one entry survives a merge.
/// Deployments override it through configuration.
pub const LIMIT_PER_SEARCH: usize = 1;

/// Merge per-host results into a single response
///
/// `results[i]` is `None` when host `i` failed or returned nothing.
pub fn merge(
    organization_id: &str,
    request: &SearchRequest,
    results: Vec<Option<LogResponseList>>,
    limit: usize,
) -> LogResponseList {
    let mut entries = flatten(results);
    let total = entries.len();
    entries.sort_by_key(|entry| entry.timestamp);

    let entries = clip(entries, limit, request.n_first);
    let (from, to) = time_range(&entries).unwrap_or((request.from, request.to));
    debug!(total, kept = entries.len(), limit, n_first = request.n_first, "merge: clipped entries");

    LogResponseList {
        organization_id: organization_id.to_string(),
        from,
        to,
        responses: regroup(entries),
    }
}

/// Flatten present results in index order
pub fn flatten(results: Vec<Option<LogResponseList>>) -> Vec<LogEntry> {
    results.into_iter().flatten().flat_map(LogResponseList::into_entries).collect()
}

/// Keep at most `limit` sorted entries from the front or the back
fn clip(mut entries: Vec<LogEntry>, limit: usize, n_first: bool) -> Vec<LogEntry> {
    if entries.len() <= limit {
        return entries;
    }
    if n_first {
        entries.truncate(limit);
        entries
    } else {
        let start = entries.len() - limit;
        entries.split_off(start)
    }
}

type TimeRange = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

/// Range covered by sorted entries, `None` when there are none
fn time_range(entries: &[LogEntry]) -> Option<TimeRange> {
    let mut from = entries.first()?.timestamp;
    let mut to = entries.last()?.timestamp;
    if from > to {
        std::mem::swap(&mut from, &mut to);
    }
    Some((Some(from), Some(to)))
}

/// Group sorted entries by identity, groups ordered by first sight
fn regroup(entries: Vec<LogEntry>) -> Vec<LogResponseGroup> {
    let mut index: HashMap<IdentityKey, usize> = HashMap::new();
    let mut groups: Vec<LogResponseGroup> = Vec::new();

    for LogEntry { timestamp, msg, identity } in entries {
        let slot = *index.entry(identity.key()).or_insert_with(|| {
            groups.push(LogResponseGroup::new(identity));
            groups.len() - 1
        });
        groups[slot].entries.push(LogMessage { timestamp, msg });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ServiceIdentity;

    const BASE: i64 = 1_700_000_000;

    fn at(offset: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(BASE + offset, 0).unwrap()
    }

    fn identity(app: &str, service: &str) -> ServiceIdentity {
        ServiceIdentity {
            organization_id: "org".to_string(),
            app_instance_id: app.to_string(),
            service_instance_id: service.to_string(),
            ..Default::default()
        }
    }

    fn group(identity: ServiceIdentity, lines: &[(i64, &str)]) -> LogResponseGroup {
        LogResponseGroup {
            identity,
            entries: lines
                .iter()
                .map(|(offset, msg)| LogMessage {
                    timestamp: at(*offset),
                    msg: msg.to_string(),
                })
                .collect(),
        }
    }

    fn list(groups: Vec<LogResponseGroup>) -> Option<LogResponseList> {
        Some(LogResponseList {
            organization_id: "org".to_string(),
            from: None,
            to: None,
            responses: groups,
        })
    }

    fn messages(response: &LogResponseList) -> Vec<&str> {
        response
            .responses
            .iter()
            .flat_map(|g| g.entries.iter().map(|e| e.msg.as_str()))
            .collect()
    }

    #[test]
    fn test_merge_two_hosts_one_failed() {
        let request = SearchRequest::new("org");
        let results = vec![
            list(vec![group(identity("app", "svc"), &[(30, "a2"), (10, "a1")])]),
            None,
            list(vec![group(identity("app", "svc"), &[(20, "c1"), (50, "c3"), (40, "c2")])]),
        ];

        let merged = merge("org", &request, results, 10);

        assert_eq!(merged.organization_id, "org");
        assert_eq!(merged.responses.len(), 1);
        assert_eq!(messages(&merged), vec!["a1", "c1", "a2", "c2", "c3"]);
        assert_eq!(merged.from, Some(at(10)));
        assert_eq!(merged.to, Some(at(50)));
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let request = SearchRequest::new("org");
        let results = || {
            vec![
                list(vec![group(identity("app", "svc"), &[(5, "h0-a"), (5, "h0-b")])]),
                list(vec![group(identity("app", "svc"), &[(5, "h1-a"), (1, "h1-early")])]),
            ]
        };

        let first = merge("org", &request, results(), 10);
        let second = merge("org", &request, results(), 10);

        assert_eq!(first, second);
        assert_eq!(messages(&first), vec!["h1-early", "h0-a", "h0-b", "h1-a"]);
    }

    #[test]
    fn test_tied_groups_keep_arrival_order() {
        let request = SearchRequest::new("org");
        let results = vec![list(vec![
            group(identity("app", "svc-b"), &[(5, "b")]),
            group(identity("app", "svc-a"), &[(5, "a")]),
        ])];

        let merged = merge("org", &request, results, 10);

        assert_eq!(merged.responses[0].identity.service_instance_id, "svc-b");
        assert_eq!(merged.responses[1].identity.service_instance_id, "svc-a");
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let request = SearchRequest::new("org");
        let results = vec![
            list(vec![group(identity("app", "late"), &[(30, "l1")])]),
            list(vec![
                group(identity("app", "early"), &[(10, "e1"), (40, "e2")]),
                group(identity("app", "late"), &[(20, "l0")]),
            ]),
        ];

        let merged = merge("org", &request, results, 10);

        assert_eq!(merged.responses.len(), 2);
        assert_eq!(merged.responses[0].identity.service_instance_id, "early");
        assert_eq!(merged.responses[1].identity.service_instance_id, "late");
        let late: Vec<&str> = merged.responses[1].entries.iter().map(|e| e.msg.as_str()).collect();
        assert_eq!(late, vec!["l0", "l1"]);
    }

    #[test]
    fn test_separator_in_ids_does_not_merge_groups() {
        let request = SearchRequest::new("org");
        let results = vec![list(vec![
            group(identity("a#b", "c"), &[(1, "first")]),
            group(identity("a", "b#c"), &[(2, "second")]),
        ])];

        let merged = merge("org", &request, results, 10);
        assert_eq!(merged.responses.len(), 2);
    }

    #[test]
    fn test_clip_keeps_latest_by_default() {
        let request = SearchRequest::new("org");
        let results = vec![list(vec![group(
            identity("app", "svc"),
            &[(1, "m1"), (2, "m2"), (3, "m3"), (4, "m4"), (5, "m5")],
        )])];

        let merged = merge("org", &request, results, 2);

        assert_eq!(messages(&merged), vec!["m4", "m5"]);
        assert_eq!(merged.from, Some(at(4)));
        assert_eq!(merged.to, Some(at(5)));
    }

    #[test]
    fn test_clip_keeps_earliest_with_n_first() {
        let request = SearchRequest {
            n_first: true,
            ..SearchRequest::new("org")
        };
        let results = vec![list(vec![group(
            identity("app", "svc"),
            &[(5, "m5"), (1, "m1"), (3, "m3"), (2, "m2"), (4, "m4")],
        )])];

        let merged = merge("org", &request, results, 3);

        assert_eq!(messages(&merged), vec!["m1", "m2", "m3"]);
        assert_eq!(merged.from, Some(at(1)));
        assert_eq!(merged.to, Some(at(3)));
    }

    #[test]
    fn test_default_limit_keeps_single_entry() {
        let request = SearchRequest::new("org");
        let results = vec![
            list(vec![group(identity("app", "svc-1"), &[(1, "old")])]),
            list(vec![group(identity("app", "svc-2"), &[(9, "new")])]),
        ];

        let merged = merge("org", &request, results, LIMIT_PER_SEARCH);

        assert_eq!(merged.responses.len(), 1);
        assert_eq!(messages(&merged), vec!["new"]);
        assert_eq!(merged.from, merged.to);
    }

    #[test]
    fn test_empty_result_uses_request_bounds() {
        let request = SearchRequest {
            from: Some(at(-100)),
            to: Some(at(100)),
            ..SearchRequest::new("org")
        };
        let results = vec![None, list(vec![]), list(vec![group(identity("app", "svc"), &[])])];

        let merged = merge("org", &request, results, 10);

        assert!(merged.responses.is_empty());
        assert_eq!(merged.from, Some(at(-100)));
        assert_eq!(merged.to, Some(at(100)));
    }

    #[test]
    fn test_no_results_at_all() {
        let request = SearchRequest::new("org");
        let merged = merge("org", &request, vec![], 10);

        assert!(merged.responses.is_empty());
        assert_eq!(merged.from, None);
        assert_eq!(merged.to, None);
    }

    #[test]
    fn test_time_range_ignores_backend_bounds() {
        let request = SearchRequest::new("org");
        let mut skewed = list(vec![group(identity("app", "svc"), &[(7, "only")])]).unwrap();
        skewed.from = Some(at(-1000));
        skewed.to = Some(at(1000));

        let merged = merge("org", &request, vec![Some(skewed)], 10);

        assert_eq!(merged.from, Some(at(7)));
        assert_eq!(merged.to, Some(at(7)));
    }

    #[test]
    fn test_time_range_swaps_descending_input() {
        let entries = vec![
            LogEntry {
                timestamp: at(9),
                msg: "late".to_string(),
                identity: identity("app", "svc"),
            },
            LogEntry {
                timestamp: at(1),
                msg: "early".to_string(),
                identity: identity("app", "svc"),
            },
        ];

        assert_eq!(time_range(&entries), Some((Some(at(1)), Some(at(9)))));
        assert_eq!(time_range(&[]), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn host_strategy() -> impl Strategy<Value = Vec<Option<Vec<(i64, u8, u8)>>>> {
            prop::collection::vec(
                prop::option::of(prop::collection::vec((0i64..50, 0u8..3, 0u8..3), 0..12)),
                0..5,
            )
        }

        type Lines = HashMap<String, (IdentityKey, DateTime<Utc>)>;

        fn build(hosts: &[Option<Vec<(i64, u8, u8)>>]) -> (Vec<Option<LogResponseList>>, Lines) {
            let mut keys = HashMap::new();
            let results = hosts
                .iter()
                .enumerate()
                .map(|(h, host)| {
                    host.as_ref().map(|lines| {
                        let groups = lines
                            .iter()
                            .enumerate()
                            .map(|(i, (offset, app, svc))| {
                                let id = identity(&format!("app-{app}"), &format!("svc-{svc}"));
                                let msg = format!("h{h}-{i}");
                                keys.insert(msg.clone(), (id.key(), at(*offset)));
                                group(id, &[(*offset, msg.as_str())])
                            })
                            .collect();
                        LogResponseList {
                            organization_id: "org".to_string(),
                            from: None,
                            to: None,
                            responses: groups,
                        }
                    })
                })
                .collect();
            (results, keys)
        }

        proptest! {
            #[test]
            fn grouping_and_range_hold(hosts in host_strategy(), limit in 1usize..20, n_first in any::<bool>()) {
                let (results, keys) = build(&hosts);
                let total = keys.len();
                let request = SearchRequest { n_first, ..SearchRequest::new("org") };

                let merged = merge("org", &request, results, limit);

                prop_assert_eq!(merged.entry_count(), total.min(limit));

                let mut seen_keys = std::collections::HashSet::new();
                let mut kept = std::collections::HashSet::new();
                let mut all = Vec::new();
                for g in &merged.responses {
                    let key = g.identity.key();
                    prop_assert!(seen_keys.insert(key.clone()), "group key appears twice");
                    prop_assert!(g.entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
                    for e in &g.entries {
                        prop_assert_eq!(keys.get(&e.msg).map(|(k, _)| k), Some(&key));
                        prop_assert!(kept.insert(e.msg.clone()), "entry appears twice");
                        all.push(e.timestamp);
                    }
                }

                let dropped: Vec<DateTime<Utc>> = keys
                    .iter()
                    .filter(|(msg, _)| !kept.contains(*msg))
                    .map(|(_, (_, ts))| *ts)
                    .collect();
                for ts in &dropped {
                    if n_first {
                        prop_assert!(all.iter().all(|k| k <= ts));
                    } else {
                        prop_assert!(all.iter().all(|k| k >= ts));
                    }
                }

                if let (Some(min), Some(max)) = (all.iter().min(), all.iter().max()) {
                    prop_assert_eq!(merged.from, Some(*min));
                    prop_assert_eq!(merged.to, Some(*max));
                } else {
                    prop_assert_eq!(merged.from, None);
                    prop_assert_eq!(merged.to, None);
                }
            }
        }
    }
}
