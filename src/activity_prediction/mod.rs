pub mod activity_model;
pub mod decision_mapper;
pub mod features_extractor;
pub mod min_max_scaler;
pub mod sliding_window;
