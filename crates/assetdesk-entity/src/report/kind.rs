//! Report kinds and their field catalogues.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use assetdesk_core::AppError;

/// Value type of a reportable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text.
    Text,
    /// Whole number.
    Integer,
    /// Fixed-point number (money, quantities).
    Decimal,
    /// True/false flag.
    Boolean,
    /// Calendar date.
    Date,
    /// Timestamp.
    DateTime,
}

impl FieldType {
    /// Whether ordering comparisons are meaningful.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, Self::Boolean)
    }

    /// Whether `LIKE`/`ILIKE` apply.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Postgres type used when comparing filter values against this field.
    pub fn sql_cast(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "bigint",
            Self::Decimal => "numeric",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "timestamptz",
        }
    }
}

/// A reportable field of a [`ReportKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    /// Column name in the source table.
    pub name: &'static str,
    /// Human-readable header label.
    pub label: &'static str,
    /// Value type.
    pub field_type: FieldType,
}

const fn field(name: &'static str, label: &'static str, field_type: FieldType) -> FieldDef {
    FieldDef {
        name,
        label,
        field_type,
    }
}

const ASSET_FIELDS: &[FieldDef] = &[
    field("id", "ID", FieldType::Integer),
    field("asset_tag", "Asset Tag", FieldType::Text),
    field("name", "Name", FieldType::Text),
    field("serial_number", "Serial Number", FieldType::Text),
    field("category", "Category", FieldType::Text),
    field("manufacturer", "Manufacturer", FieldType::Text),
    field("model", "Model", FieldType::Text),
    field("status", "Status", FieldType::Text),
    field("purchase_date", "Purchase Date", FieldType::Date),
    field("purchase_cost", "Purchase Cost", FieldType::Decimal),
    field("warranty_expires_at", "Warranty Expires", FieldType::Date),
    field("assigned_to", "Assigned To", FieldType::Integer),
    field("location_id", "Location", FieldType::Integer),
    field("is_active", "Active", FieldType::Boolean),
    field("created_at", "Created At", FieldType::DateTime),
    field("updated_at", "Updated At", FieldType::DateTime),
];

const USER_FIELDS: &[FieldDef] = &[
    field("id", "ID", FieldType::Integer),
    field("name", "Name", FieldType::Text),
    field("email", "Email", FieldType::Text),
    field("department", "Department", FieldType::Text),
    field("job_title", "Job Title", FieldType::Text),
    field("phone", "Phone", FieldType::Text),
    field("location_id", "Location", FieldType::Integer),
    field("is_active", "Active", FieldType::Boolean),
    field("last_login_at", "Last Login", FieldType::DateTime),
    field("created_at", "Created At", FieldType::DateTime),
    field("updated_at", "Updated At", FieldType::DateTime),
];

const MAINTENANCE_FIELDS: &[FieldDef] = &[
    field("id", "ID", FieldType::Integer),
    field("asset_id", "Asset", FieldType::Integer),
    field("title", "Title", FieldType::Text),
    field("maintenance_type", "Type", FieldType::Text),
    field("status", "Status", FieldType::Text),
    field("scheduled_date", "Scheduled Date", FieldType::Date),
    field("completed_date", "Completed Date", FieldType::Date),
    field("cost", "Cost", FieldType::Decimal),
    field("performed_by", "Performed By", FieldType::Text),
    field("created_at", "Created At", FieldType::DateTime),
    field("updated_at", "Updated At", FieldType::DateTime),
];

const LOCATION_FIELDS: &[FieldDef] = &[
    field("id", "ID", FieldType::Integer),
    field("name", "Name", FieldType::Text),
    field("code", "Code", FieldType::Text),
    field("address", "Address", FieldType::Text),
    field("city", "City", FieldType::Text),
    field("country", "Country", FieldType::Text),
    field("is_active", "Active", FieldType::Boolean),
    field("created_at", "Created At", FieldType::DateTime),
    field("updated_at", "Updated At", FieldType::DateTime),
];

/// The closed set of report sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Tracked assets.
    Asset,
    /// Users of the asset system.
    User,
    /// Maintenance records.
    Maintenance,
    /// Physical locations.
    Location,
}

impl ReportKind {
    /// Every kind, in display order.
    pub const ALL: [ReportKind; 4] = [Self::Asset, Self::User, Self::Maintenance, Self::Location];

    /// Source table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Asset => "assets",
            Self::User => "users",
            Self::Maintenance => "maintenances",
            Self::Location => "locations",
        }
    }

    /// Field catalogue.
    pub fn fields(&self) -> &'static [FieldDef] {
        match self {
            Self::Asset => ASSET_FIELDS,
            Self::User => USER_FIELDS,
            Self::Maintenance => MAINTENANCE_FIELDS,
            Self::Location => LOCATION_FIELDS,
        }
    }

    /// Columns used when a definition does not choose its own.
    pub fn default_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Asset => &["asset_tag", "name", "category", "status", "purchase_date"],
            Self::User => &["name", "email", "department", "is_active"],
            Self::Maintenance => &["asset_id", "title", "status", "scheduled_date", "cost"],
            Self::Location => &["name", "code", "city", "country"],
        }
    }

    /// Field used when a definition has no sort field.
    pub fn default_sort_field(&self) -> &'static str {
        "created_at"
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::User => "user",
            Self::Maintenance => "maintenance",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" | "assets" => Ok(Self::Asset),
            "user" | "users" => Ok(Self::User),
            "maintenance" | "maintenances" => Ok(Self::Maintenance),
            "location" | "locations" => Ok(Self::Location),
            _ => Err(AppError::validation(format!(
                "Invalid report type: '{s}'. Expected one of: asset, user, maintenance, location"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_columns_are_in_catalogue() {
        for kind in ReportKind::ALL {
            for column in kind.default_columns() {
                assert!(kind.field(column).is_some(), "{kind}: {column}");
            }
            assert!(kind.field(kind.default_sort_field()).is_some());
        }
    }

    #[test]
    fn test_unknown_kind_is_validation_error() {
        let err = "vehicle".parse::<ReportKind>().unwrap_err();
        assert_eq!(err.kind, assetdesk_core::error::ErrorKind::Validation);
    }

    #[test]
    fn test_field_lookup() {
        let field = ReportKind::Asset.field("purchase_cost").unwrap();
        assert_eq!(field.field_type, FieldType::Decimal);
        assert!(ReportKind::Location.field("purchase_cost").is_none());
    }
}
