//! 参数优化数据模型

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 优化方法
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMethod {
    GridSearch,
    Genetic,
    Bayesian,
}

/// 优化目标
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationObjective {
    TotalReturn,
    SharpeRatio,
    MaxDrawdown,
    CalmarRatio,
    WinRate,
    ProfitLossRatio,
}

/// 贝叶斯采集函数
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    #[serde(rename = "EI")]
    ExpectedImprovement,
    #[serde(rename = "PI")]
    ProbabilityOfImprovement,
    #[serde(rename = "UCB")]
    UpperConfidenceBound,
}

/// 参数取值范围
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamRange {
    Int {
        min: i64,
        max: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<i64>,
    },
    Float {
        min: f64,
        max: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },
    Choice {
        choices: Vec<Value>,
    },
}

/// 优化请求
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OptimizationRequest {
    pub strategy_type: String,
    pub stock_code: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_capital: Option<f64>,
    pub optimization_method: OptimizationMethod,
    pub param_ranges: BTreeMap<String, ParamRange>,
    pub objective: OptimizationObjective,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_jobs: Option<u32>,

    // 遗传算法参数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossover_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutation_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elitism_rate: Option<f64>,

    // 贝叶斯优化参数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_iter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_init: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition: Option<Acquisition>,
}

/// 单次试验结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrialResult {
    pub params: BTreeMap<String, Value>,
    pub score: f64,
}

/// 优化结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OptimizationResult {
    pub best_params: BTreeMap<String, Value>,
    pub best_score: f64,
    #[serde(default)]
    pub all_results: Vec<TrialResult>,
    #[serde(default)]
    pub optimization_time: f64,
    #[serde(default)]
    pub iterations: u32,
    #[serde(default)]
    pub convergence_curve: Vec<f64>,
}

/// 并行优化任务
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OptimizationTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub request: OptimizationRequest,
}

/// 并行优化响应
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ParallelOptimizationResponse {
    pub total: u32,
    pub successful: u32,
    pub failed: u32,
    #[serde(default)]
    pub results: Vec<OptimizationResult>,
}

/// 保存优化结果回执
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SaveOptimizationResponse {
    pub success: bool,
    pub result_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试参数范围的标签序列化
    #[test]
    fn test_param_range_tagged() {
        let r = ParamRange::Int { min: 5, max: 30, step: Some(5) };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "int");
        assert_eq!(json["max"], 30);

        let c: ParamRange =
            serde_json::from_str(r#"{"type":"choice","choices":["a","b"]}"#).unwrap();
        assert!(matches!(c, ParamRange::Choice { ref choices } if choices.len() == 2));
        assert_eq!(
            serde_json::to_string(&OptimizationMethod::GridSearch).unwrap(),
            "\"grid_search\""
        );
    }
}
