use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use crate::form::{RideForm, PAYMENT_METHODS, VEHICLE_TYPES};

const FORM_TEMPLATE: &str = "form";

#[derive(Serialize)]
struct SelectOption {
    value: &'static str,
    selected: bool,
}

/// Outcome block shown under the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Invalid { message: String },
    Predicted { status: String },
    ApiError { message: String },
    Unreachable { message: String },
}

#[derive(Serialize)]
struct PageView<'a> {
    form: &'a RideForm,
    vehicle_types: Vec<SelectOption>,
    payment_methods: Vec<SelectOption>,
    outcome: Option<&'a Outcome>,
}

fn options(values: &[&'static str], selected: &str) -> Vec<SelectOption> {
    values
        .iter()
        .map(|v| SelectOption {
            value: v,
            selected: *v == selected,
        })
        .collect()
}

/// Compiled page templates. Handlebars escapes every `{{value}}`, including API responses.
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_template_string(FORM_TEMPLATE, include_str!("../templates/form.hbs"))?;
        Ok(Self { registry })
    }

    pub fn render(&self, form: &RideForm, outcome: Option<&Outcome>) -> Result<String, RenderError> {
        let view = PageView {
            form,
            vehicle_types: options(&VEHICLE_TYPES, &form.vehicle_type),
            payment_methods: options(&PAYMENT_METHODS, &form.payment_method),
            outcome,
        };
        self.registry.render(FORM_TEMPLATE, &view)
    }
}
