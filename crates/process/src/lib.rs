//! External process lifecycle: command templates, the single-process
//! supervisor, and the output relay that pumps child output into a bounded
//! queue.

pub mod relay;
pub mod supervisor;
pub mod template;

pub use relay::{
    OUTPUT_QUEUE_CAPACITY, OutputReceiver, OutputSender, RelayStats, drain_ready, output_channel,
};
pub use supervisor::{OutputStreams, ProcessSupervisor, StartedProcess, Templates};
pub use template::CommandTemplate;
