pub mod customer;
pub mod machine;
pub mod machine_model;
pub mod model_part;
pub mod part_replacement;
pub mod reading;
pub mod submission;
