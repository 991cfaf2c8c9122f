pub mod token_estimator;
