mod format;
mod json;
mod table;

pub(crate) use json::{
    batch_json, estimate_json, model_json, models_json, print_json, providers_json, version_json,
};
pub(crate) use table::{
    print_batch_table, print_estimate_table, print_model_table, print_models_table,
    print_providers_table,
};
