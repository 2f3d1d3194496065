//! 随机抽题
//!
//! 不放回的均匀抽样。熵源由调用方注入，测试可用固定种子复现。
//! `count >= len` 时原样返回全部记录（保持输入顺序）。

use rand::seq::SliceRandom;
use rand::Rng;

/// 从 `records` 中不放回地均匀抽取 `count` 条
///
/// 调用方负责保证 `1 <= count`；超过总数时返回全部。
pub fn sample<T: Clone, R: Rng + ?Sized>(records: &[T], count: usize, rng: &mut R) -> Vec<T> {
    if count >= records.len() {
        return records.to_vec();
    }
    records.choose_multiple(rng, count).cloned().collect()
}

/// 使用线程本地随机源抽样
pub fn sample_with_thread_rng<T: Clone>(records: &[T], count: usize) -> Vec<T> {
    let mut rng = rand::thread_rng();
    sample(records, count, &mut rng)
}
