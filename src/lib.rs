//! e2e-pipeline 命令行的应用层：参数到各阶段的编排。

pub mod app;
pub mod common;
