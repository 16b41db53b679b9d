//! The openEHR reference model as a [`Catalog`].
//!
//! Covers the EHR, composition, entry, data-structure, data-type, identifier
//! and demographic packages to the depth AQL queries navigate them. Attribute
//! names follow the canonical JSON serialisation (`snake_case`, `_type`
//! discriminator on every locatable).

use crate::catalog::{Catalog, ClassDef};
use crate::types::FieldShape;

/// Classes that own a physical document table and can therefore appear in a
/// FROM clause or on either side of a structural join.
pub const TABLE_CLASSES: &[&str] = &[
    "EHR",
    "EHR_STATUS",
    "EHR_ACCESS",
    "COMPOSITION",
    "FOLDER",
    "CONTRIBUTION",
    "PERSON",
    "GROUP",
    "ORGANISATION",
    "AGENT",
    "ROLE",
];

/// Demographic actor classes linked through party relationships.
pub const PARTY_CLASSES: &[&str] = &["PERSON", "GROUP", "ORGANISATION", "AGENT"];

/// Attribute holding the RM class name inside every stored node.
pub const TYPE_DISCRIMINATOR: &str = "_type";

fn text() -> FieldShape {
    FieldShape::string()
}

fn class(name: &str) -> FieldShape {
    FieldShape::class(name)
}

fn locatable(name: &str) -> ClassDef {
    ClassDef::concrete(name)
        .field(TYPE_DISCRIMINATOR, text())
        .field("name", class("DV_TEXT"))
        .field("archetype_node_id", text())
        .field("uid,omitempty", class("UID_BASED_ID").optional())
        .field("archetype_details,omitempty", class("ARCHETYPED").optional())
}

fn entry(name: &str) -> ClassDef {
    locatable(name)
        .field("language", class("CODE_PHRASE"))
        .field("encoding", class("CODE_PHRASE"))
        .field("subject", class("PARTY_PROXY"))
        .field("provider,omitempty", class("PARTY_PROXY").optional())
        .field(
            "other_participations,omitempty",
            class("PARTICIPATION").list().optional(),
        )
        .field("workflow_id,omitempty", class("OBJECT_REF").optional())
        .field("protocol,omitempty", class("ITEM_STRUCTURE").optional())
}

fn actor(name: &str) -> ClassDef {
    party(name)
        .field("languages,omitempty", class("DV_TEXT").list().optional())
        .field("roles,omitempty", class("PARTY_REF").list().optional())
}

fn party(name: &str) -> ClassDef {
    locatable(name)
        .field("identities", class("PARTY_IDENTITY").list())
        .field("contacts,omitempty", class("CONTACT").list().optional())
        .field(
            "relationships,omitempty",
            class("PARTY_RELATIONSHIP").list().optional(),
        )
        .field("details,omitempty", class("ITEM_STRUCTURE").optional())
}

fn identifier(name: &str) -> ClassDef {
    ClassDef::concrete(name)
        .field(TYPE_DISCRIMINATOR, text())
        .field("value", text())
}

fn data_value(name: &str) -> ClassDef {
    ClassDef::concrete(name).field(TYPE_DISCRIMINATOR, text())
}

impl Catalog {
    /// Build the standard openEHR reference-model catalog.
    pub fn openehr() -> Self {
        let mut catalog = Catalog::new();
        for class in identifiers()
            .into_iter()
            .chain(data_types())
            .chain(structures())
            .chain(entries())
            .chain(ehr())
            .chain(demographics())
        {
            catalog.register(class);
        }
        tracing::debug!(classes = catalog.len(), "Built openEHR reference model catalog");
        catalog
    }
}

fn identifiers() -> Vec<ClassDef> {
    vec![
        ClassDef::abstract_class(
            "OBJECT_ID",
            &[
                "HIER_OBJECT_ID",
                "OBJECT_VERSION_ID",
                "GENERIC_ID",
                "TERMINOLOGY_ID",
                "ARCHETYPE_ID",
                "TEMPLATE_ID",
            ],
        ),
        ClassDef::abstract_class("UID_BASED_ID", &["HIER_OBJECT_ID", "OBJECT_VERSION_ID"]),
        identifier("HIER_OBJECT_ID"),
        identifier("OBJECT_VERSION_ID"),
        identifier("GENERIC_ID").field("scheme", text()),
        identifier("TERMINOLOGY_ID"),
        identifier("ARCHETYPE_ID"),
        identifier("TEMPLATE_ID"),
        ClassDef::concrete("OBJECT_REF")
            .field(TYPE_DISCRIMINATOR, text())
            .field("namespace", text())
            .field("type", text())
            .field("id", class("OBJECT_ID")),
        ClassDef::concrete("PARTY_REF")
            .field(TYPE_DISCRIMINATOR, text())
            .field("namespace", text())
            .field("type", text())
            .field("id", class("OBJECT_ID")),
        ClassDef::concrete("ARCHETYPED")
            .field("archetype_id", class("ARCHETYPE_ID"))
            .field("template_id,omitempty", class("TEMPLATE_ID").optional())
            .field("rm_version", text()),
        ClassDef::abstract_class(
            "PARTY_PROXY",
            &["PARTY_SELF", "PARTY_IDENTIFIED", "PARTY_RELATED"],
        ),
        ClassDef::concrete("PARTY_SELF")
            .field(TYPE_DISCRIMINATOR, text())
            .field("external_ref,omitempty", class("PARTY_REF").optional()),
        ClassDef::concrete("PARTY_IDENTIFIED")
            .field(TYPE_DISCRIMINATOR, text())
            .field("external_ref,omitempty", class("PARTY_REF").optional())
            .field("name,omitempty", text().optional())
            .field("identifiers,omitempty", class("DV_IDENTIFIER").list().optional()),
        ClassDef::concrete("PARTY_RELATED")
            .field(TYPE_DISCRIMINATOR, text())
            .field("external_ref,omitempty", class("PARTY_REF").optional())
            .field("name,omitempty", text().optional())
            .field("relationship", class("DV_CODED_TEXT")),
        ClassDef::concrete("PARTICIPATION")
            .field(TYPE_DISCRIMINATOR, text())
            .field("function", class("DV_TEXT"))
            .field("performer", class("PARTY_PROXY"))
            .field("mode,omitempty", class("DV_CODED_TEXT").optional()),
        ClassDef::concrete("AUDIT_DETAILS")
            .field(TYPE_DISCRIMINATOR, text())
            .field("system_id", text())
            .field("time_committed", class("DV_DATE_TIME"))
            .field("change_type", class("DV_CODED_TEXT"))
            .field("description,omitempty", class("DV_TEXT").optional())
            .field("committer", class("PARTY_PROXY")),
    ]
}

fn data_types() -> Vec<ClassDef> {
    vec![
        ClassDef::abstract_class(
            "DATA_VALUE",
            &[
                "DV_TEXT",
                "DV_CODED_TEXT",
                "DV_QUANTITY",
                "DV_COUNT",
                "DV_PROPORTION",
                "DV_ORDINAL",
                "DV_BOOLEAN",
                "DV_DATE_TIME",
                "DV_DATE",
                "DV_TIME",
                "DV_DURATION",
                "DV_IDENTIFIER",
                "DV_URI",
                "DV_EHR_URI",
            ],
        ),
        data_value("DV_TEXT")
            .field("value", text())
            .field("formatting,omitempty", text().optional()),
        data_value("DV_CODED_TEXT")
            .field("value", text())
            .field("defining_code", class("CODE_PHRASE")),
        ClassDef::concrete("CODE_PHRASE")
            .field(TYPE_DISCRIMINATOR, text())
            .field("terminology_id", class("TERMINOLOGY_ID"))
            .field("code_string", text())
            .field("preferred_term,omitempty", text().optional()),
        data_value("DV_QUANTITY")
            .field("magnitude", FieldShape::float())
            .field("units", text())
            .field("precision,omitempty", FieldShape::integer().optional())
            .field("normal_status,omitempty", class("CODE_PHRASE").optional()),
        data_value("DV_COUNT").field("magnitude", FieldShape::integer()),
        data_value("DV_PROPORTION")
            .field("numerator", FieldShape::float())
            .field("denominator", FieldShape::float())
            .field("type", FieldShape::integer()),
        data_value("DV_ORDINAL")
            .field("value", FieldShape::integer())
            .field("symbol", class("DV_CODED_TEXT")),
        data_value("DV_BOOLEAN").field("value", FieldShape::boolean()),
        data_value("DV_DATE_TIME").field("value", text()),
        data_value("DV_DATE").field("value", text()),
        data_value("DV_TIME").field("value", text()),
        data_value("DV_DURATION").field("value", text()),
        data_value("DV_IDENTIFIER")
            .field("issuer,omitempty", text().optional())
            .field("assigner,omitempty", text().optional())
            .field("id", text())
            .field("type,omitempty", text().optional()),
        data_value("DV_URI").field("value", text()),
        data_value("DV_EHR_URI").field("value", text()),
    ]
}

fn structures() -> Vec<ClassDef> {
    vec![
        ClassDef::abstract_class(
            "ITEM_STRUCTURE",
            &["ITEM_TREE", "ITEM_LIST", "ITEM_SINGLE", "ITEM_TABLE"],
        ),
        locatable("ITEM_TREE").field("items,omitempty", class("ITEM").list().optional()),
        locatable("ITEM_LIST").field("items,omitempty", class("ELEMENT").list().optional()),
        locatable("ITEM_SINGLE").field("item", class("ELEMENT")),
        locatable("ITEM_TABLE").field("rows,omitempty", class("CLUSTER").list().optional()),
        ClassDef::abstract_class("ITEM", &["CLUSTER", "ELEMENT"]),
        locatable("CLUSTER").field("items", class("ITEM").list()),
        locatable("ELEMENT")
            .field("value,omitempty", class("DATA_VALUE").optional())
            .field("null_flavour,omitempty", class("DV_CODED_TEXT").optional()),
        locatable("HISTORY")
            .field("origin", class("DV_DATE_TIME"))
            .field("period,omitempty", class("DV_DURATION").optional())
            .field("duration,omitempty", class("DV_DURATION").optional())
            .field("events,omitempty", class("EVENT").list().optional())
            .field("summary,omitempty", class("ITEM_STRUCTURE").optional()),
        ClassDef::abstract_class("EVENT", &["POINT_EVENT", "INTERVAL_EVENT"]),
        locatable("POINT_EVENT")
            .field("time", class("DV_DATE_TIME"))
            .field("data", class("ITEM_STRUCTURE"))
            .field("state,omitempty", class("ITEM_STRUCTURE").optional()),
        locatable("INTERVAL_EVENT")
            .field("time", class("DV_DATE_TIME"))
            .field("data", class("ITEM_STRUCTURE"))
            .field("state,omitempty", class("ITEM_STRUCTURE").optional())
            .field("width", class("DV_DURATION"))
            .field("math_function", class("DV_CODED_TEXT"))
            .field("sample_count,omitempty", FieldShape::integer().optional()),
    ]
}

fn entries() -> Vec<ClassDef> {
    vec![
        ClassDef::abstract_class(
            "CONTENT_ITEM",
            &[
                "SECTION",
                "OBSERVATION",
                "EVALUATION",
                "INSTRUCTION",
                "ACTION",
                "ADMIN_ENTRY",
            ],
        ),
        ClassDef::abstract_class(
            "ENTRY",
            &[
                "OBSERVATION",
                "EVALUATION",
                "INSTRUCTION",
                "ACTION",
                "ADMIN_ENTRY",
            ],
        ),
        locatable("SECTION").field("items,omitempty", class("CONTENT_ITEM").list().optional()),
        entry("OBSERVATION")
            .field("data", class("HISTORY"))
            .field("state,omitempty", class("HISTORY").optional()),
        entry("EVALUATION").field("data", class("ITEM_STRUCTURE")),
        entry("INSTRUCTION")
            .field("narrative", class("DV_TEXT"))
            .field("expiry_time,omitempty", class("DV_DATE_TIME").optional())
            .field("activities,omitempty", class("ACTIVITY").list().optional()),
        locatable("ACTIVITY")
            .field("description", class("ITEM_STRUCTURE"))
            .field("action_archetype_id", text()),
        entry("ACTION")
            .field("time", class("DV_DATE_TIME"))
            .field("description", class("ITEM_STRUCTURE"))
            .field("ism_transition", class("ISM_TRANSITION"))
            .field(
                "instruction_details,omitempty",
                class("INSTRUCTION_DETAILS").optional(),
            ),
        ClassDef::concrete("ISM_TRANSITION")
            .field(TYPE_DISCRIMINATOR, text())
            .field("current_state", class("DV_CODED_TEXT"))
            .field("transition,omitempty", class("DV_CODED_TEXT").optional())
            .field("careflow_step,omitempty", class("DV_CODED_TEXT").optional()),
        ClassDef::concrete("INSTRUCTION_DETAILS")
            .field(TYPE_DISCRIMINATOR, text())
            .field("instruction_id", class("OBJECT_REF"))
            .field("activity_id", text()),
        entry("ADMIN_ENTRY").field("data", class("ITEM_STRUCTURE")),
    ]
}

fn ehr() -> Vec<ClassDef> {
    vec![
        ClassDef::concrete("EHR")
            .field(TYPE_DISCRIMINATOR, text())
            .field("system_id", class("HIER_OBJECT_ID"))
            .field("ehr_id", class("HIER_OBJECT_ID"))
            .field("time_created", class("DV_DATE_TIME"))
            .field("ehr_status", class("OBJECT_REF"))
            .field("ehr_access", class("OBJECT_REF"))
            .field("compositions,omitempty", class("OBJECT_REF").list().optional())
            .field("directory,omitempty", class("OBJECT_REF").optional())
            .field("contributions", class("OBJECT_REF").list())
            .field("folders,omitempty", class("OBJECT_REF").list().optional()),
        locatable("EHR_STATUS")
            .field("subject", class("PARTY_SELF"))
            .field("is_queryable", FieldShape::boolean())
            .field("is_modifiable", FieldShape::boolean())
            .field("other_details,omitempty", class("ITEM_STRUCTURE").optional()),
        locatable("EHR_ACCESS"),
        locatable("COMPOSITION")
            .field("language", class("CODE_PHRASE"))
            .field("territory", class("CODE_PHRASE"))
            .field("category", class("DV_CODED_TEXT"))
            .field("composer", class("PARTY_PROXY"))
            .field("context,omitempty", class("EVENT_CONTEXT").optional())
            .field("content,omitempty", class("CONTENT_ITEM").list().optional()),
        ClassDef::concrete("EVENT_CONTEXT")
            .field(TYPE_DISCRIMINATOR, text())
            .field("start_time", class("DV_DATE_TIME"))
            .field("end_time,omitempty", class("DV_DATE_TIME").optional())
            .field("location,omitempty", text().optional())
            .field("setting", class("DV_CODED_TEXT"))
            .field("other_context,omitempty", class("ITEM_STRUCTURE").optional())
            .field(
                "health_care_facility,omitempty",
                class("PARTY_IDENTIFIED").optional(),
            )
            .field(
                "participations,omitempty",
                class("PARTICIPATION").list().optional(),
            ),
        locatable("FOLDER")
            .field("items,omitempty", class("OBJECT_REF").list().optional())
            .field("folders,omitempty", class("FOLDER").list().optional())
            .field("details,omitempty", class("ITEM_STRUCTURE").optional()),
        ClassDef::concrete("CONTRIBUTION")
            .field(TYPE_DISCRIMINATOR, text())
            .field("uid", class("HIER_OBJECT_ID"))
            .field("versions", class("OBJECT_REF").list())
            .field("audit", class("AUDIT_DETAILS")),
    ]
}

fn demographics() -> Vec<ClassDef> {
    vec![
        actor("PERSON"),
        actor("GROUP"),
        actor("ORGANISATION"),
        actor("AGENT"),
        party("ROLE").field("performer", class("PARTY_REF")),
        locatable("PARTY_IDENTITY").field("details", class("ITEM_STRUCTURE")),
        locatable("CONTACT").field("addresses", class("ADDRESS").list()),
        locatable("ADDRESS").field("details", class("ITEM_STRUCTURE")),
        locatable("PARTY_RELATIONSHIP")
            .field("source", class("PARTY_REF"))
            .field("target", class("PARTY_REF"))
            .field("details,omitempty", class("ITEM_STRUCTURE").optional()),
    ]
}
