//! Reconciles the two land classification schemes found in the price
//! series.
//!
//! Up to 2016 prices were published by soil type (`Roxa`, `Mista`,
//! `Arenosa`) crossed with a mechanization tier. From 2017 on they follow
//! the land-capability system, classes `A-I` to `C-VIII`. Every record is
//! mapped into the newer scheme so both periods aggregate together.
//!
//! The legacy -> capability table is a heuristic equivalence:
//! - `Roxa` (most fertile) + `Mecanizada` -> `A-I`, + `Mecanizável` -> `A-II`
//! - `Mista` shifts one class down, `Arenosa` two
//! - `Não Mecanizável` -> `B-VI`/`B-VII` (pasture, forestry)
//! - `Inaproveitáveis` -> `C-VIII` (preservation)

use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use crate::types::{PriceRecord, RawPriceRecord};

/// Category shared by every record of the capability scheme.
pub const CAPABILITY_CATEGORY: &str = "Classe de Capacidade de Uso";

/// Mechanization tiers of the legacy scheme.
pub const LEGACY_SUBCATEGORIES: [&str; 4] =
    ["Mecanizada", "Mecanizável", "Não Mecanizável", "Inaproveitáveis"];

static CLASS_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ABC]-[IV]+$").expect("valid regex"));

/// How [`get_label`] renders a class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelFormat {
    /// The bare code, e.g. `A-II`.
    Short,
    /// The descriptive label without the trailing `(Classe ..)`.
    Sipt,
    #[default]
    Full,
}

impl FromStr for LabelFormat {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to [`LabelFormat::Full`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "curto" => LabelFormat::Short,
            "sipt" => LabelFormat::Sipt,
            _ => LabelFormat::Full,
        })
    }
}

/// One of the three capability groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassGroup {
    pub key: char,
    pub name: &'static str,
    pub color: &'static str,
    pub classes: &'static [&'static str],
}

pub const GROUPS: [ClassGroup; 3] = [
    ClassGroup {
        key: 'A',
        name: "Grupo A - Terras Cultiváveis",
        color: "#4a7a86",
        classes: &["A-I", "A-II", "A-III", "A-IV"],
    },
    ClassGroup {
        key: 'B',
        name: "Grupo B - Pastagens e Reflorestamento",
        color: "#85c5cf",
        classes: &["B-V", "B-VI", "B-VII"],
    },
    ClassGroup {
        key: 'C',
        name: "Grupo C - Preservação",
        color: "#C6AC8F",
        classes: &["C-VIII"],
    },
];

fn translate_category(category: &str) -> Option<&'static str> {
    match category {
        "Roxa" | "Mista" | "Arenosa" | CAPABILITY_CATEGORY => Some(CAPABILITY_CATEGORY),
        _ => None,
    }
}

fn translate_legacy(category: &str, subcategory: &str) -> Option<&'static str> {
    let code = match (category, subcategory) {
        ("Roxa", "Mecanizada") => "A-I",
        ("Roxa", "Mecanizável") => "A-II",
        ("Roxa", "Não Mecanizável") => "B-VI",
        ("Roxa", "Inaproveitáveis") => "C-VIII",

        ("Mista", "Mecanizada") => "A-II",
        ("Mista", "Mecanizável") => "A-III",
        ("Mista", "Não Mecanizável") => "B-VII",
        ("Mista", "Inaproveitáveis") => "C-VIII",

        ("Arenosa", "Mecanizada") => "A-III",
        ("Arenosa", "Mecanizável") => "A-IV",
        ("Arenosa", "Não Mecanizável") => "B-VII",
        ("Arenosa", "Inaproveitáveis") => "C-VIII",

        _ => return None,
    };
    Some(code)
}

/// The canonical code when `code` is one of the eight known classes.
fn known_class(code: &str) -> Option<&'static str> {
    GROUPS
        .iter()
        .flat_map(|g| g.classes.iter().copied())
        .find(|c| *c == code)
}

fn class_label(code: &str) -> Option<&'static str> {
    let label = match code {
        "A-I" => "Lavoura - Aptidão Boa (Classe I)",
        "A-II" => "Lavoura - Aptidão Boa (Classe II)",
        "A-III" => "Lavoura - Aptidão Regular (Classe III)",
        "A-IV" => "Lavoura - Aptidão Restrita (Classe IV)",
        "B-V" => "Pastagem Plantada (Classe V)",
        "B-VI" => "Pastagem Plantada (Classe VI)",
        "B-VII" => "Silvicultura - Pastagem Natural (Classe VII)",
        "C-VIII" => "Preservação da Flora (Classe VIII)",
        _ => return None,
    };
    Some(label)
}

/// Detailed description of a class, empty for unknown codes.
pub fn get_description(code: &str) -> &'static str {
    match code {
        "A-I" => "Terras cultiváveis, aparentemente sem problemas especiais de conservação. Grãos com altas produtividades.",
        "A-II" => "Terras cultiváveis com problemas simples de conservação. Grãos com produtividades acima da média.",
        "A-III" => "Terras cultiváveis com problemas complexos de conservação. Grãos com produtividades médias.",
        "A-IV" => "Terras cultiváveis ocasionalmente com sérios problemas de conservação. Grãos e pastagens para gado de leite.",
        "B-V" => "Terras para pastagens e/ou reflorestamento. Áreas alagáveis não sistematizadas.",
        "B-VI" => "Terras para pastagens e/ou reflorestamento com problemas simples. Pastagens para bovino de corte.",
        "B-VII" => "Terras somente para pastagens ou reflorestamento com problemas complexos. Áreas declivosas.",
        "C-VIII" => "Terras impróprias para cultura, pastagem ou reflorestamento. Proteção da fauna e flora silvestre.",
        _ => "",
    }
}

pub fn get_label(code: &str, format: LabelFormat) -> String {
    if code.is_empty() {
        return String::new();
    }
    match (format, class_label(code)) {
        (LabelFormat::Short, _) | (_, None) => code.to_string(),
        (LabelFormat::Sipt, Some(label)) => label
            .split('(')
            .next()
            .unwrap_or(label)
            .trim()
            .to_string(),
        (LabelFormat::Full, Some(label)) => label.to_string(),
    }
}

pub fn get_group(code: &str) -> Option<&'static ClassGroup> {
    GROUPS.iter().find(|g| g.classes.contains(&code))
}

/// `true` for capability codes such as `B-VII`.
pub fn is_new_format(token: &str) -> bool {
    CLASS_CODE_RE.is_match(token)
}

pub fn is_legacy_format(token: &str) -> bool {
    LEGACY_SUBCATEGORIES.contains(&token)
}

/// Map one source record into the capability scheme. Never drops a record;
/// unknown values pass through untouched.
pub fn normalize(raw: RawPriceRecord) -> PriceRecord {
    let category_original = raw.category.unwrap_or_default();
    let subcategory_original = raw.subcategory.unwrap_or_default();

    let (category, subcategory) = if category_original == CAPABILITY_CATEGORY
        && is_new_format(&subcategory_original)
    {
        (category_original.clone(), subcategory_original.clone())
    } else {
        let category = translate_category(&category_original)
            .map(str::to_string)
            .unwrap_or_else(|| category_original.clone());
        let subcategory = translate_legacy(&category_original, &subcategory_original)
            .or_else(|| known_class(&subcategory_original))
            .map(str::to_string)
            .unwrap_or_else(|| subcategory_original.clone());
        (category, subcategory)
    };

    PriceRecord {
        year: raw.year,
        level: raw.level.unwrap_or_default(),
        territory: raw.territory.unwrap_or_default(),
        territory_code: raw.territory_code,
        category,
        subcategory,
        class: raw.class.unwrap_or_default(),
        price: raw.price,
        unit: raw.unit.unwrap_or_default(),
        region: raw.region.unwrap_or_default(),
        mesoregion: raw.mesoregion.unwrap_or_default(),
        category_original,
        subcategory_original,
    }
}

pub fn normalize_all(raws: Vec<RawPriceRecord>) -> Vec<PriceRecord> {
    raws.into_iter().map(normalize).collect()
}
