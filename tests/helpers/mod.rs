// ==========================================
// 集成测试辅助模块
// ==========================================

#![allow(dead_code)]

pub mod mock_repository;

pub use mock_repository::ScriptedRepository;
