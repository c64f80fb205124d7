// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use std::io::Write;
use tempfile::NamedTempFile;
use vetintel_mrl::domain::lab::LabSample;
use vetintel_mrl::domain::treatment::TreatmentInput;
use vetintel_mrl::domain::types::{ResidueUnit, Route, Species};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, hour: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(hour, 0, 0).unwrap()
}

// ==========================================
// LabSample 构建器
// ==========================================

pub struct LabSampleBuilder {
    substance_name: String,
    measured_value: f64,
    unit: ResidueUnit,
    scope: String,
    batch_id: String,
    farmer_id: Option<String>,
    animal_id: String,
    test_date: NaiveDate,
    lab_name: String,
}

impl LabSampleBuilder {
    pub fn new(substance: &str) -> Self {
        Self {
            substance_name: substance.to_string(),
            measured_value: 0.0,
            unit: ResidueUnit::UgPerKg,
            scope: "Milk".to_string(),
            batch_id: "BATCH001".to_string(),
            farmer_id: Some("1".to_string()),
            animal_id: "COW001".to_string(),
            test_date: date(2024, 1, 25),
            lab_name: "Central Lab, Hyderabad".to_string(),
        }
    }

    pub fn measured(mut self, value: f64, unit: ResidueUnit) -> Self {
        self.measured_value = value;
        self.unit = unit;
        self
    }

    pub fn scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    pub fn animal(mut self, animal_id: &str) -> Self {
        self.animal_id = animal_id.to_string();
        self
    }

    pub fn batch(mut self, batch_id: &str) -> Self {
        self.batch_id = batch_id.to_string();
        self
    }

    pub fn build(self) -> LabSample {
        LabSample {
            substance_name: self.substance_name,
            measured_value: self.measured_value,
            unit: self.unit,
            scope: self.scope,
            batch_id: self.batch_id,
            farmer_id: self.farmer_id,
            animal_id: self.animal_id,
            test_date: self.test_date,
            lab_name: self.lab_name,
        }
    }
}

// ==========================================
// TreatmentInput 构建器
// ==========================================

pub struct TreatmentBuilder {
    substance_name: String,
    dose: f64,
    route: Route,
    species: Species,
    treatment_date: NaiveDate,
    animal_id: String,
}

impl TreatmentBuilder {
    pub fn new(substance: &str) -> Self {
        Self {
            substance_name: substance.to_string(),
            dose: 10.0,
            route: Route::Oral,
            species: Species::Cattle,
            treatment_date: date(2024, 1, 20),
            animal_id: "COW001".to_string(),
        }
    }

    pub fn dose(mut self, dose: f64) -> Self {
        self.dose = dose;
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.route = route;
        self
    }

    pub fn species(mut self, species: Species) -> Self {
        self.species = species;
        self
    }

    pub fn on(mut self, treatment_date: NaiveDate) -> Self {
        self.treatment_date = treatment_date;
        self
    }

    pub fn animal(mut self, animal_id: &str) -> Self {
        self.animal_id = animal_id.to_string();
        self
    }

    pub fn build(self) -> TreatmentInput {
        TreatmentInput {
            substance_name: self.substance_name,
            dose: self.dose,
            dose_unit: "ml".to_string(),
            route: self.route,
            species: self.species,
            treatment_date: self.treatment_date,
            animal_id: self.animal_id,
        }
    }
}

// ==========================================
// CSV 文件
// ==========================================

pub const LAB_CSV_HEADER: &str =
    "Batch ID,Farmer ID,Animal ID,Test Date,Antimicrobial Name,Residue Level (mg/kg),Lab Name";

/// 写出检测结果 CSV（rows 不含表头）
pub fn write_lab_csv(rows: &[String]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "{}", LAB_CSV_HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn lab_csv_row(batch: &str, animal: &str, substance: &str, residue_mg: f64) -> String {
    format!(
        "{},1,{},2024-01-25,{},{},Central Lab",
        batch, animal, substance, residue_mg
    )
}
