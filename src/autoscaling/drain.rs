//! Scale-down eviction planning: never drops ready capacity faster than
//! one pod at a time, and never evicts below the number of replicas
//! required to stay healthy.

/// Computes how many pods are safe to evict this pass when scaling a
/// component down from `current_replicas` to `target_replicas`.
///
/// Evicts at most one pod per reconcile regardless of how large the gap
/// to `target_replicas` is, and refuses to evict below `min_ready`
/// (the minimum replica count the component's readiness policy requires to
/// keep serving traffic).
pub fn next_eviction_count(current_replicas: i32, target_replicas: i32, min_ready: i32) -> i32 {
    if target_replicas >= current_replicas {
        return 0;
    }
    let floor = target_replicas.max(min_ready);
    if current_replicas <= floor {
        return 0;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_nothing_when_scaling_up() {
        assert_eq!(next_eviction_count(2, 4, 1), 0);
    }

    #[test]
    fn evicts_one_pod_at_a_time_regardless_of_gap() {
        assert_eq!(next_eviction_count(10, 2, 1), 1);
    }

    #[test]
    fn stops_at_min_ready_floor() {
        assert_eq!(next_eviction_count(2, 0, 2), 0);
    }

    #[test]
    fn no_eviction_when_already_at_target() {
        assert_eq!(next_eviction_count(3, 3, 1), 0);
    }
}
