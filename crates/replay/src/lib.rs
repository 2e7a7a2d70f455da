//! 事件日志重建
//!
//! 从调度实验写出的行分隔JSON记录流重建一次实验运行的内存模型。
//! 每次构建单遍、严格顺序，构建器独占可变状态；构建完成的日志
//! 不可变，可被任意数量的消费者并发只读访问。相互独立的日志
//! 可以由独立的构建器并行构建。

pub mod builder;
pub mod decoder;
pub mod wrap;

pub use builder::EventLogBuilder;
pub use decoder::{decode_path, decode_reader, DecodedLine, DecodedStream};
pub use schedlog_errors::{SchedlogError, SchedlogResult};
