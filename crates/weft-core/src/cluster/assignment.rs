use crate::config::PartitionsConfig;

use super::PartitionId;

/// How a node picks its partitions out of the cluster's partition ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PartitionAssignment {
    /// Own every partition.
    #[default]
    All,
    /// Own the configured ids that exist in the cluster.
    Explicit(Vec<PartitionId>),
    /// Own one contiguous share of the ids, see [`split_and_get_sublist`].
    Sharded { node_count: u32, node_id: u32 },
}

impl PartitionAssignment {
    /// Derive the assignment from configuration. A non-empty id list wins over sharding.
    pub fn from_config(config: &PartitionsConfig) -> Self {
        if !config.partition_ids.is_empty() {
            return Self::Explicit(config.partition_ids.clone());
        }
        match (config.node_count, config.current_node_id) {
            (Some(node_count), Some(node_id)) => Self::Sharded {
                node_count,
                node_id,
            },
            _ => Self::All,
        }
    }

    /// Select the owned partitions from the retrieved ids, keeping their order.
    pub fn select(&self, retrieved: &[PartitionId]) -> Vec<PartitionId> {
        match self {
            Self::All => retrieved.to_vec(),
            Self::Explicit(configured) => retrieved
                .iter()
                .copied()
                .filter(|id| configured.contains(id))
                .collect(),
            Self::Sharded {
                node_count,
                node_id,
            } => {
                if node_id >= node_count {
                    tracing::warn!(
                        node_id = *node_id,
                        node_count = *node_count,
                        "Misconfiguration: node id must be strictly less than node count. No partitions will be selected"
                    );
                    return Vec::new();
                }
                split_and_get_sublist(retrieved, *node_count as usize, *node_id as usize)
            }
        }
    }
}

/// Cut `items` into `sublist_count` contiguous chunks and return chunk `index`.
///
/// With `n` items every chunk holds `n / sublist_count` items and the first
/// `n % sublist_count` chunks hold one more. An out-of-range index, or a zero
/// count, yields an empty list.
pub fn split_and_get_sublist<T: Clone>(items: &[T], sublist_count: usize, index: usize) -> Vec<T> {
    if sublist_count == 0 || index >= sublist_count {
        return Vec::new();
    }
    let base = items.len() / sublist_count;
    let extra = items.len() % sublist_count;
    let start = index * base + index.min(extra);
    let len = base + usize::from(index < extra);
    items[start..start + len].to_vec()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    fn ids(n: u32) -> Vec<PartitionId> {
        (1..=n).collect()
    }

    #[test]
    fn test_sharded_even_split() {
        let assignment = PartitionAssignment::Sharded {
            node_count: 3,
            node_id: 1,
        };
        assert_eq!(assignment.select(&ids(6)), vec![3, 4]);
    }

    #[test]
    fn test_sharded_uneven_split_front_loads_remainder() {
        let select = |node_id| {
            PartitionAssignment::Sharded {
                node_count: 3,
                node_id,
            }
            .select(&ids(7))
        };
        assert_eq!(select(0), vec![1, 2, 3]);
        assert_eq!(select(1), vec![4, 5]);
        assert_eq!(select(2), vec![6, 7]);
    }

    #[test]
    fn test_sharded_more_nodes_than_partitions() {
        let select = |node_id| {
            PartitionAssignment::Sharded {
                node_count: 4,
                node_id,
            }
            .select(&ids(2))
        };
        assert_eq!(select(0), vec![1]);
        assert_eq!(select(1), vec![2]);
        assert!(select(2).is_empty());
        assert!(select(3).is_empty());
    }

    #[test]
    fn test_shards_cover_every_partition_once() {
        let all = ids(11);
        let mut covered: Vec<PartitionId> = (0..4)
            .flat_map(|node_id| split_and_get_sublist(&all, 4, node_id))
            .collect();
        covered.sort_unstable();
        assert_eq!(covered, all);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn select_logged(
        assignment: &PartitionAssignment,
        retrieved: &[PartitionId],
    ) -> (Vec<PartitionId>, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let selected =
            tracing::subscriber::with_default(subscriber, || assignment.select(retrieved));
        let output = String::from_utf8_lossy(&logs.0.lock().unwrap()).into_owned();
        (selected, output)
    }

    #[test]
    fn test_misconfigured_node_id_selects_nothing() {
        let assignment = PartitionAssignment::Sharded {
            node_count: 3,
            node_id: 5,
        };
        let (selected, logs) = select_logged(&assignment, &ids(6));

        assert!(selected.is_empty());
        assert!(logs.contains("WARN"));
        assert!(logs.contains("node_id=5"));
        assert!(logs.contains("No partitions will be selected"));
    }

    #[test]
    fn test_zero_node_count_selects_nothing() {
        let assignment = PartitionAssignment::Sharded {
            node_count: 0,
            node_id: 0,
        };
        let (selected, logs) = select_logged(&assignment, &ids(6));

        assert!(selected.is_empty());
        assert!(logs.contains("WARN"));
    }

    #[test]
    fn test_valid_shard_logs_no_warning() {
        let assignment = PartitionAssignment::Sharded {
            node_count: 3,
            node_id: 1,
        };
        let (selected, logs) = select_logged(&assignment, &ids(6));

        assert_eq!(selected, vec![3, 4]);
        assert!(!logs.contains("WARN"));
    }

    #[test]
    fn test_explicit_intersection() {
        let assignment = PartitionAssignment::Explicit(vec![5, 2, 9]);
        assert_eq!(assignment.select(&ids(6)), vec![2, 5]);
    }

    #[test]
    fn test_all() {
        assert_eq!(PartitionAssignment::All.select(&ids(3)), vec![1, 2, 3]);
    }

    #[test]
    fn test_from_config_prefers_explicit_ids() {
        let config = PartitionsConfig {
            partition_ids: vec![1, 2],
            node_count: Some(2),
            current_node_id: Some(0),
        };
        assert_eq!(
            PartitionAssignment::from_config(&config),
            PartitionAssignment::Explicit(vec![1, 2])
        );
    }

    #[test]
    fn test_from_config_sharded_needs_both_values() {
        let config = PartitionsConfig {
            partition_ids: vec![],
            node_count: Some(2),
            current_node_id: None,
        };
        assert_eq!(
            PartitionAssignment::from_config(&config),
            PartitionAssignment::All
        );

        let config = PartitionsConfig {
            current_node_id: Some(1),
            ..config
        };
        assert_eq!(
            PartitionAssignment::from_config(&config),
            PartitionAssignment::Sharded {
                node_count: 2,
                node_id: 1
            }
        );
    }
}
