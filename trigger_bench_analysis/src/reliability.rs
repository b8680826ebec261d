// SPDX-License-Identifier: MIT

/// Aggregate reliability counters for one (runtime, trigger, workload
/// mode, workload input) partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReliabilityTally {
    pub original_invokes: usize,
    pub original_executes: usize,
    pub duplicates_invokes: usize,
    pub duplicates_executes: usize,
    pub missing_executes: usize,
    pub out_of_order: usize,
    pub residual_invokes: usize,
    pub residual_executes: usize,
    /// Set when the execute side ran out before the invoke side during
    /// the ordering walk: a data-quality problem of the input sequences,
    /// reported instead of propagated as a crash.
    pub sequence_defect: bool,
}

/// Outcome of the positional ordering walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRepair {
    pub out_of_order: usize,
    pub sequence_defect: bool,
    pub invoke_ids: Vec<String>,
    pub execute_ids: Vec<String>,
}

fn occurrences(ids: &[String]) -> std::collections::HashMap<&str, usize> {
    let mut counts = std::collections::HashMap::new();
    for id in ids {
        *counts.entry(id.as_str()).or_insert(0) += 1;
    }
    counts
}

fn excess(counts: &std::collections::HashMap<&str, usize>) -> usize {
    counts.values().filter(|count| **count > 1).map(|count| count - 1).sum()
}

/// Walk the invoke sequence by position against the execute sequence,
/// counting mismatches. A mismatched invoke id found later in the
/// execute sequence is moved back to the current position, so one
/// misplacement does not cascade into the comparisons that follow.
///
/// This is a positional repair heuristic, not an edit-distance metric:
/// it under-counts when the wanted id is not findable and the repair
/// side effect alters later comparisons. Recorded results depend on
/// this exact bias, so callers wanting a different ordering metric swap
/// this function, not its callers.
pub fn repair_order(invoke_ids: Vec<String>, execute_ids: Vec<String>) -> OrderRepair {
    let mut execute_ids = execute_ids;
    let mut out_of_order = 0;
    let mut sequence_defect = false;

    for i in 0..invoke_ids.len() {
        if i >= execute_ids.len() {
            sequence_defect = true;
            break;
        }
        if invoke_ids[i] != execute_ids[i] {
            out_of_order += 1;
            if let Some(offset) = execute_ids[i + 1..].iter().position(|id| *id == invoke_ids[i]) {
                let id = execute_ids.remove(i + 1 + offset);
                execute_ids.insert(i, id);
            }
        }
    }

    OrderRepair {
        out_of_order,
        sequence_defect,
        invoke_ids,
        execute_ids,
    }
}

/// Reconcile an ordered sequence of invocation attempts against an
/// ordered sequence of observed executions.
///
/// Returns the tally plus the residual sequences left after removing
/// duplicates and missing entries. Pure: both inputs are taken by
/// reference and all intermediate state is local.
///
/// Steps, in order:
/// 1. count excess occurrences per side (duplicates);
/// 2. drop every occurrence of any id that repeats within either
///    sequence, from both sequences;
/// 3. unique invoke ids absent from the full execute sequence are the
///    missing executions, removed before the ordering walk;
/// 4. positional ordering walk with repair, see [`repair_order`].
pub fn aggregate(invoke_ids: &[String], execute_ids: &[String]) -> (ReliabilityTally, Vec<String>, Vec<String>) {
    let invoke_counts = occurrences(invoke_ids);
    let execute_counts = occurrences(execute_ids);
    let duplicates_invokes = excess(&invoke_counts);
    let duplicates_executes = excess(&execute_counts);

    let repeated: std::collections::HashSet<&str> = invoke_counts
        .iter()
        .chain(execute_counts.iter())
        .filter(|(_, count)| **count > 1)
        .map(|(id, _)| *id)
        .collect();
    let mut invoke_unique: Vec<String> = invoke_ids.iter().filter(|id| !repeated.contains(id.as_str())).cloned().collect();
    let execute_unique: Vec<String> = execute_ids.iter().filter(|id| !repeated.contains(id.as_str())).cloned().collect();

    let observed: std::collections::HashSet<&str> = execute_ids.iter().map(|id| id.as_str()).collect();
    let missing_executes = invoke_unique.iter().filter(|id| !observed.contains(id.as_str())).count();
    invoke_unique.retain(|id| observed.contains(id.as_str()));

    let repair = repair_order(invoke_unique, execute_unique);

    let tally = ReliabilityTally {
        original_invokes: invoke_ids.len(),
        original_executes: execute_ids.len(),
        duplicates_invokes,
        duplicates_executes,
        missing_executes,
        out_of_order: repair.out_of_order,
        residual_invokes: repair.invoke_ids.len(),
        residual_executes: repair.execute_ids.len(),
        sequence_defect: repair.sequence_defect,
    };
    (tally, repair.invoke_ids, repair.execute_ids)
}
