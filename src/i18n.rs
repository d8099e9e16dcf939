//! i18n.rs — embedded UI string tables, one per supported language.
//!
//! Tables are static data baked into the binary; an unrecognized language
//! code falls back to English rather than erroring.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// Language served when the requested one is unknown.
pub const DEFAULT_LANG: &str = "en";

static TABLES: Lazy<HashMap<&'static str, Value>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "en",
        json!({
            "welcome": "Welcome to Wildfire Tracker",
            "dashboard": "Dashboard",
            "dashboardDetails": {
                "activeFires": "Active Fires",
                "airQuality": "Air Quality",
                "fireArea": "Fire Area",
                "structuresDamaged": "Structures Damaged"
            },
            "inventoryManager": "Insurance Inventory List Manager",
            "forum": "Forum",
            "forumDetails": {
                "title": "Public Forum",
                "placeholder": "Share your wildfire update...",
                "postButton": "Post",
                "updatesTitle": "Updates"
            },
            "header": {
                "calFire": "CAL FIRE",
                "feedback": "Feedback",
                "helpImprove": "Help Improve This"
            }
        }),
    );
    m.insert(
        "es",
        json!({
            "welcome": "Bienvenido a Brújula de Incendios",
            "dashboard": "Tablero",
            "dashboardDetails": {
                "activeFires": "Incendios Activos",
                "airQuality": "Calidad del Aire",
                "fireArea": "Área de Incendio",
                "structuresDamaged": "Estructuras Dañadas"
            },
            "inventoryManager": "Gestor de Lista de Inventario de Seguros",
            "forum": "Foro",
            "forumDetails": {
                "title": "Foro Público",
                "placeholder": "Comparte tu actualización sobre incendios...",
                "postButton": "Publicar",
                "updatesTitle": "Actualizaciones"
            },
            "header": {
                "calFire": "CAL FIRE",
                "feedback": "Retroalimentación",
                "helpImprove": "Ayuda a Mejorar Esto"
            }
        }),
    );
    m.insert(
        "ko",
        json!({
            "welcome": "산불 컴퍼스로 오신 것을 환영합니다",
            "dashboard": "대시보드",
            "dashboardDetails": {
                "activeFires": "활성 화재",
                "airQuality": "공기 질",
                "fireArea": "화재 면적",
                "structuresDamaged": "손상된 구조물"
            },
            "inventoryManager": "보험 재고 목록 관리자",
            "forum": "공개 포럼",
            "forumDetails": {
                "title": "공개 포럼",
                "placeholder": "산불 업데이트를 공유하세요...",
                "postButton": "게시",
                "updatesTitle": "업데이트"
            },
            "header": {
                "calFire": "캘파이어",
                "feedback": "피드백",
                "helpImprove": "이것을 개선하는 데 도움"
            }
        }),
    );
    m
});

/// The string table for `lang`; English for anything unrecognized.
pub fn table(lang: &str) -> &'static Value {
    TABLES
        .get(lang)
        .or_else(|| TABLES.get(DEFAULT_LANG))
        .expect("english table present")
}

pub fn supported_langs() -> impl Iterator<Item = &'static str> {
    TABLES.keys().copied()
}
