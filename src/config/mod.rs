//! 配置管理模块
//!
//! 提供应用程序配置加载和管理功能，支持 TOML 配置文件和环境变量覆盖。
//! 每个组件在构造时接收自己需要的配置片段，不存在全局配置对象。

pub mod config;
pub mod loader;
