//! Property tests over the tokenizer, the planner and live data sets.

use proptest::prelude::*;
use rowfeed_codec::{parse_line, split_raw, RowSplitter};
use rowfeed_core::{
    advance, compute_block, leftover_rows, BlockAllocation, DataSetConfig, OutOfValuesPolicy,
    PartitionState, SelectionMode, Step,
};
use rowfeed_testkit::{
    join_lines, numbered_rows, partition_layout_strategy, plain_row_strategy, policy_strategy,
    quotable_row_strategy, quoted_line, TempCsv,
};

proptest! {
    #[test]
    fn plain_rows_split_the_same_both_ways(fields in plain_row_strategy()) {
        let line = fields.join(",");
        prop_assert_eq!(parse_line(&line, ',').unwrap(), split_raw(&line, ","));
        prop_assert_eq!(parse_line(&line, ',').unwrap().join(","), line);
    }

    #[test]
    fn quoted_rows_round_trip(fields in quotable_row_strategy()) {
        let splitter = RowSplitter::new(";", true).unwrap();
        let line = quoted_line(&fields, ';');
        prop_assert_eq!(splitter.split(&line).unwrap(), fields);
    }

    #[test]
    fn auto_blocks_cover_all_but_leftover((rows, workers) in partition_layout_strategy()) {
        let mut covered = 0;
        let mut next_start = 0;
        for ordinal in 1..=workers {
            let block = compute_block(rows, ordinal, workers, BlockAllocation::Auto, 0).unwrap();
            prop_assert_eq!(block.start, next_start);
            next_start = block.end + 1;
            covered += block.len();
        }
        prop_assert_eq!(rows - covered, leftover_rows(rows, workers));
        prop_assert!(leftover_rows(rows, workers) < workers);
    }

    #[test]
    fn abort_reads_each_block_row_exactly_once(len in 1usize..30, start in 0usize..50) {
        let mut state = PartitionState::new(rowfeed_core::Block { start, end: start + len - 1 });
        let mut rows = Vec::new();
        loop {
            match advance(&mut state, OutOfValuesPolicy::AbortThread) {
                Step::Read { row, .. } => rows.push(row),
                Step::EndOfBlock => break,
            }
        }
        prop_assert_eq!(rows, (start..start + len).collect::<Vec<_>>());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn unique_rows_always_inside_own_block(
        (rows, workers) in partition_layout_strategy(),
        policy in policy_strategy(),
        calls in 1usize..40,
    ) {
        let csv = TempCsv::new("d.csv", &join_lines(&numbered_rows("r", rows)));
        let data = csv.data_set(
            DataSetConfig::new("d.csv")
                .variable_names("v")
                .selection(SelectionMode::Unique)
                .out_of_values(policy)
                .block_allocation(BlockAllocation::Auto),
        );
        let ordinal = workers;
        let block = compute_block(rows, ordinal, workers, BlockAllocation::Auto, 0).unwrap();
        let mut worker = csv.worker(ordinal, workers);

        for _ in 0..calls {
            match data.next_row(&mut worker) {
                Ok(row) => {
                    let line = row.line.unwrap();
                    prop_assert!(block.contains(line));
                    prop_assert_eq!(row.fields, vec![format!("r{line}")]);
                }
                Err(e) => {
                    prop_assert_eq!(policy, OutOfValuesPolicy::AbortThread);
                    prop_assert!(e.is_end_of_data());
                    break;
                }
            }
        }
    }
}
