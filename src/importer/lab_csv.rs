// ==========================================
// 兽药残留合规核心 - 检测结果 CSV 解析器
// ==========================================
// 格式: Batch ID, Farmer ID, Animal ID, Test Date,
//       Antimicrobial Name, Residue Level (mg/kg), Lab Name [, Tissue]
// 规则: 每行一个 LabSample；非空行数超过上限整批拒绝
// ==========================================

use crate::config::ComplianceConfig;
use crate::domain::lab::LabSample;
use crate::domain::types::ResidueUnit;
use crate::engine::error::ComplianceError;
use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

// 列名（大小写不敏感）
pub const COL_BATCH_ID: &str = "Batch ID";
pub const COL_FARMER_ID: &str = "Farmer ID";
pub const COL_ANIMAL_ID: &str = "Animal ID";
pub const COL_TEST_DATE: &str = "Test Date";
pub const COL_SUBSTANCE: &str = "Antimicrobial Name";
pub const COL_RESIDUE_PREFIX: &str = "Residue Level";
pub const COL_LAB_NAME: &str = "Lab Name";
pub const COL_TISSUE: &str = "Tissue";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// 表头列下标
struct ColumnIndex {
    batch_id: usize,
    farmer_id: usize,
    animal_id: usize,
    test_date: usize,
    substance: usize,
    residue: usize,
    lab_name: usize,
    tissue: Option<usize>,
    residue_unit: ResidueUnit,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> ImportResult<Self> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |col: &str| names.iter().position(|h| *h == col.to_lowercase());
        let require = |col: &str| find(col).ok_or_else(|| ImportError::MissingColumn(col.to_string()));

        let residue_prefix = COL_RESIDUE_PREFIX.to_lowercase();
        let residue = names
            .iter()
            .position(|h| h.starts_with(&residue_prefix))
            .ok_or_else(|| ImportError::MissingColumn(format!("{} (mg/kg)", COL_RESIDUE_PREFIX)))?;
        let residue_unit = residue_unit_from_header(&names[residue])?;

        Ok(Self {
            batch_id: require(COL_BATCH_ID)?,
            farmer_id: require(COL_FARMER_ID)?,
            animal_id: require(COL_ANIMAL_ID)?,
            test_date: require(COL_TEST_DATE)?,
            substance: require(COL_SUBSTANCE)?,
            residue,
            lab_name: require(COL_LAB_NAME)?,
            tissue: find(COL_TISSUE),
            residue_unit,
        })
    }
}

/// "Residue Level (mg/kg)" → MgPerKg；无括号默认 mg/kg
fn residue_unit_from_header(header: &str) -> ImportResult<ResidueUnit> {
    let unit = header
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(unit, _)| unit.trim());

    match unit {
        None => Ok(ResidueUnit::MgPerKg),
        Some(raw) => raw.parse::<ResidueUnit>().map_err(|message| {
            ImportError::Compliance(ComplianceError::validation("residue_unit", message))
        }),
    }
}

fn parse_date(row: usize, field: &str, value: &str) -> ImportResult<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| ImportError::DateFormatError {
            row,
            field: field.to_string(),
            value: value.to_string(),
        })
}

// ==========================================
// LabCsvParser - 检测结果 CSV 解析器
// ==========================================
pub struct LabCsvParser {
    max_rows: usize,
    default_scope: String,
}

impl LabCsvParser {
    pub fn new(config: &ComplianceConfig) -> Self {
        Self {
            max_rows: config.max_batch_rows,
            default_scope: config.default_sample_scope.clone(),
        }
    }

    /// 解析文件（仅 .csv）
    pub fn parse_file(&self, path: &Path) -> ImportResult<Vec<LabSample>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(path)?;
        self.parse_reader(file)
    }

    /// 解析任意 CSV 输入
    ///
    /// # 错误
    /// - MissingColumn: 表头缺少必需列
    /// - Compliance(BatchSizeExceeded): 非空行数超过上限（整批拒绝）
    /// - 行级错误: 首个非法行即终止，携带行号（表头为第 1 行）
    pub fn parse_reader<R: Read>(&self, reader: R) -> ImportResult<Vec<LabSample>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = ColumnIndex::from_headers(reader.headers()?)?;

        // 先读出全部非空行，行数校验先于逐行校验
        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            if record.iter().all(|v| v.is_empty()) {
                continue;
            }
            rows.push((idx + 2, record));
        }

        if rows.len() > self.max_rows {
            warn!(rows = rows.len(), max = self.max_rows, "检测结果文件超出行数上限，整批拒绝");
            return Err(ComplianceError::BatchSizeExceeded {
                rows: rows.len(),
                max: self.max_rows,
            }
            .into());
        }

        let samples = rows
            .iter()
            .map(|(row, record)| self.map_row(*row, record, &columns))
            .collect::<ImportResult<Vec<_>>>()?;

        info!(rows = samples.len(), "检测结果文件解析完成");
        Ok(samples)
    }

    fn map_row(&self, row: usize, record: &StringRecord, cols: &ColumnIndex) -> ImportResult<LabSample> {
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
        let required = |idx: usize, field: &str| -> ImportResult<String> {
            let value = cell(idx);
            if value.is_empty() {
                return Err(ImportError::RequiredFieldMissing {
                    row,
                    field: field.to_string(),
                });
            }
            Ok(value.to_string())
        };

        let residue_raw = required(cols.residue, COL_RESIDUE_PREFIX)?;
        let measured_value: f64 =
            residue_raw
                .parse()
                .map_err(|_| ImportError::TypeConversionError {
                    row,
                    field: COL_RESIDUE_PREFIX.to_string(),
                    message: format!("无法解析为数值: {}", residue_raw),
                })?;
        if !measured_value.is_finite() || measured_value < 0.0 {
            return Err(ImportError::TypeConversionError {
                row,
                field: COL_RESIDUE_PREFIX.to_string(),
                message: format!("残留值必须为非负数: {}", residue_raw),
            });
        }

        let test_date_raw = required(cols.test_date, COL_TEST_DATE)?;
        let test_date = parse_date(row, COL_TEST_DATE, &test_date_raw)?;

        let farmer_id = Some(cell(cols.farmer_id))
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let scope = cols
            .tissue
            .map(|idx| cell(idx))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_scope.clone());

        Ok(LabSample {
            substance_name: required(cols.substance, COL_SUBSTANCE)?,
            measured_value,
            unit: cols.residue_unit,
            scope,
            batch_id: required(cols.batch_id, COL_BATCH_ID)?,
            farmer_id,
            animal_id: required(cols.animal_id, COL_ANIMAL_ID)?,
            test_date,
            lab_name: required(cols.lab_name, COL_LAB_NAME)?,
        })
    }
}
