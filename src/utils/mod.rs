pub mod a1;
pub mod grade_cell;
pub mod masking;
pub mod time;
pub mod validation;
