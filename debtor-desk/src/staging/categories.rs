//! Keyword-based grouping of a debtor's documents for display.
//!
//! Categories exist only on the client side. A document belongs to the first
//! category, in table order, whose keyword occurs in its lower-cased name.

use super::PendingChanges;
use crate::models::{Document, DocumentId};
use serde::Serialize;

pub const NEW_FILES_CATEGORY: &str = "Новые файлы";
pub const OTHER_CATEGORY: &str = "Другие документы";

/// Keywords are stored lower-case.
#[derive(Debug, Clone, Copy)]
pub struct CategoryDef {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

impl CategoryDef {
    /// Both `lowered` and the keywords must be lower-case.
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(*keyword))
    }
}

/// Named categories in priority order. "Новые файлы" and "Другие документы"
/// are not listed: they have no keywords.
pub static CATEGORY_DEFS: &[CategoryDef] = &[
    CategoryDef {
        name: "Личные документы",
        keywords: &[
            "паспорт",
            "pasport",
            "инн",
            "inn",
            "снилс",
            "snils",
            "свидетельство о браке",
            "свидетельство о разводе",
            "брак",
            "brak",
            "развод",
            "razvod",
        ],
    },
    CategoryDef {
        name: "Дети",
        keywords: &[
            "дети",
            "детей",
            "child",
            "children",
            "свидетельство о рождении",
            "spravka o rozhdenii",
            "birth certificate",
        ],
    },
    CategoryDef {
        name: "Трудовые документы",
        keywords: &[
            "трудовая",
            "trudovaya",
            "trudovoj",
            "сведения о трудовой",
            "svedeniya o trudovoj",
            "справка с места работы",
            "этк",
            "etk",
            "szv",
        ],
    },
    CategoryDef {
        name: "Справки о доходах",
        keywords: &[
            "2-ндфл",
            "2ндфл",
            "2 ndfl",
            "2ndfl",
            "справка о доходах",
            "spravka o dohodah",
            "справка сфр",
            "пенсия",
            "pensiya",
            "пособие",
            "posobie",
            "пособий",
            "доходах",
            "dohodah",
        ],
    },
    CategoryDef {
        name: "Пособия и льготы",
        keywords: &[
            "егиссо",
            "egisso",
            "пособия",
            "posobiya",
            "льгот",
            "lgot",
            "выплат",
            "vyplat",
            "социальных выплат",
            "едв",
            "edv",
        ],
    },
    CategoryDef {
        name: "Кредитные истории",
        keywords: &[
            "кредитный отчет",
            "kreditnyj otchet",
            "kreditnyi otchet",
            "окб",
            "okb",
            "бки",
            "bki",
            "нбки",
            "nbki",
            "отчет",
            "otchet",
            "vypiska iz okb",
            "vypiska iz bki",
            "vypiska iz nbki",
            "скоринг",
        ],
    },
    CategoryDef {
        name: "Недвижимость",
        keywords: &[
            "выписка",
            "vypiska",
            "росреестр",
            "rosreestr",
            "кадастр",
            "kadastr",
            "егрн",
            "egrn",
            "единый государственный реестр недвижимости",
            "недвижимост",
            "nedvizhimost",
        ],
    },
    CategoryDef {
        name: "Банковские счета",
        keywords: &[
            "счета",
            "scheta",
            "schyota",
            "счёта",
            "счетов",
            "schetov",
            "банковских счетов",
            "bankovskih schetov",
            "список счетов",
            "spisok schetov",
            "spravka o schetah",
        ],
    },
    CategoryDef {
        name: "Судебные документы",
        keywords: &[
            "постановление",
            "postanovlenie",
            "пристав",
            "pristav",
            "фссп",
            "fssp",
            "исполнительное производство",
            "ispolnitelnoe proizvodstvo",
        ],
    },
    CategoryDef {
        name: "Налоги и сборы",
        keywords: &[
            "налог",
            "nalog",
            "фнс",
            "fns",
            "ифнс",
            "ifns",
            "уведомление",
            "uvedomlenie",
            "егрип",
        ],
    },
    CategoryDef {
        name: "Транспорт",
        keywords: &[
            "гибдд",
            "gibdd",
            "справка гибдд",
            "spravka gibdd",
            "транспортное средство",
            "transportnoe sredstvo",
            "автомобиль",
            "avtomobil",
        ],
    },
];

fn category_index(name: &str, defs: &[CategoryDef]) -> Option<usize> {
    let lowered = name.to_lowercase();
    defs.iter().position(|def| def.matches(&lowered))
}

/// Category name for a document called `name`.
pub fn categorize(name: &str, defs: &[CategoryDef]) -> &'static str {
    category_index(name, defs)
        .map(|index| defs[index].name)
        .unwrap_or(OTHER_CATEGORY)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelEntry {
    /// A document the backend knows about, shown under its pending name if
    /// one is staged.
    Stored {
        id: DocumentId,
        filename: String,
        renamed: bool,
    },
    /// A staged new file; deleting it cancels the staging by `index`.
    Provisional {
        index: usize,
        filename: String,
        size: u64,
    },
}

impl PanelEntry {
    pub fn filename(&self) -> &str {
        match self {
            PanelEntry::Stored { filename, .. } | PanelEntry::Provisional { filename, .. } => {
                filename
            }
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, PanelEntry::Provisional { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub name: &'static str,
    /// Only the new-files group starts expanded.
    pub expanded: bool,
    pub entries: Vec<PanelEntry>,
}

impl CategoryGroup {
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_new_files(&self) -> bool {
        self.name == NEW_FILES_CATEGORY
    }
}

/// Group `documents` with the staged edits overlaid.
///
/// Documents staged for deletion are left out, staged renames decide the
/// category, and staged new files come first in their own group. Empty
/// groups are omitted.
pub fn categorize_documents(
    documents: &[Document],
    pending: &PendingChanges,
) -> Vec<CategoryGroup> {
    let other = CATEGORY_DEFS.len();
    let mut buckets: Vec<Vec<PanelEntry>> = vec![Vec::new(); other + 1];

    for doc in documents.iter().filter(|d| !pending.is_marked_for_delete(d.id)) {
        let (filename, renamed) = match pending.pending_name(doc.id) {
            Some(name) => (name, true),
            None => (doc.filename.as_str(), false),
        };
        let slot = category_index(filename, CATEGORY_DEFS).unwrap_or(other);
        buckets[slot].push(PanelEntry::Stored {
            id: doc.id,
            filename: filename.to_string(),
            renamed,
        });
    }

    let new_files: Vec<PanelEntry> = pending
        .new_files()
        .iter()
        .enumerate()
        .map(|(index, file)| PanelEntry::Provisional {
            index,
            filename: file.name.clone(),
            size: file.size(),
        })
        .collect();

    let mut groups = Vec::new();
    if !new_files.is_empty() {
        groups.push(CategoryGroup {
            name: NEW_FILES_CATEGORY,
            expanded: true,
            entries: new_files,
        });
    }

    let names = CATEGORY_DEFS
        .iter()
        .map(|def| def.name)
        .chain(std::iter::once(OTHER_CATEGORY));
    groups.extend(
        names
            .zip(buckets)
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, entries)| CategoryGroup {
                name,
                expanded: false,
                entries,
            }),
    );

    groups
}
