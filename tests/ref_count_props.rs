//! Property tests for open/close reference counting.

mod common;

use common::{register_mock, table_with_capacity};
use proptest::prelude::*;
use serial_mux::{DeviceError, DeviceFlags};

#[derive(Debug, Clone, Copy)]
enum Op {
    Open,
    Close,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Open), Just(Op::Close)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn opens_then_closes_leave_difference(opens in 0usize..20, closes in 0usize..20) {
        let table = table_with_capacity(1);
        let (dev, mock) = register_mock(&table, "A");

        for _ in 0..opens {
            dev.open(DeviceFlags::RDWR).unwrap();
        }
        let mut refused = 0;
        for _ in 0..closes {
            if matches!(dev.close(), Err(DeviceError::NotOpen)) {
                refused += 1;
            }
        }

        prop_assert_eq!(dev.ref_count(), opens.saturating_sub(closes));
        prop_assert_eq!(refused, closes.saturating_sub(opens));
        prop_assert_eq!(mock.configure_log().len(), usize::from(opens > 0));
        table.shutdown();
    }

    #[test]
    fn interleaved_ops_track_model(ops in prop::collection::vec(op(), 0..40)) {
        let table = table_with_capacity(1);
        let (dev, mock) = register_mock(&table, "A");
        let mut model = 0usize;
        let mut inits = 0usize;

        for op in ops {
            match op {
                Op::Open => {
                    dev.open(DeviceFlags::RDWR).unwrap();
                    if model == 0 {
                        inits += 1;
                    }
                    model += 1;
                }
                Op::Close => {
                    let result = dev.close();
                    prop_assert_eq!(result.is_ok(), model > 0);
                    model = model.saturating_sub(1);
                }
            }
            prop_assert_eq!(dev.ref_count(), model);
            prop_assert_eq!(dev.is_open(), model > 0);
        }

        prop_assert_eq!(mock.configure_log().len(), inits);
        prop_assert_eq!(table.multiplexer().len(), 1);
        table.shutdown();
    }
}
