#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

macro_rules! cfg_rt {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "rt")]
            #[cfg_attr(docsrs, doc(cfg(feature = "rt")))]
            $item
        )*
    }
}

pub use wsst_core::*;

#[cfg(not(feature = "rt"))]
pub use wsst_macros::scenario;

cfg_rt! {
    pub use wsst_macros::scenario_linkme as scenario;

    pub mod runtime {
        pub use wsst_runtime::registry::{distributed_slice, linkme, WSST_SCENARIOS};
        pub use wsst_runtime::{
            load_params_file, write_json, RuntimeError, ScenarioRegistry, WsstRuntime,
        };
    }
}

pub mod prelude {
    pub use crate::scenario;
    pub use wsst_core::{
        AggregateResult, Checkpoints, Connection, ConnectionParams, LoadTest, Message, Scenario,
        ScenarioResult,
    };

    cfg_rt! {
        pub use crate::runtime::WsstRuntime;
    }
}
