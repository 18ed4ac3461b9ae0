use house_price_service::{Result, model::Predictor, table::Table};
use mockall::mock;

// Mock model for exercising the handlers without a fitted artifact
mock! {
    pub Model {}

    impl Predictor for Model {
        fn predict(&self, features: &Table) -> Result<Vec<f64>>;
    }
}

/// Mock that answers every row with the same price
pub fn constant_model(price: f64) -> MockModel {
    let mut model = MockModel::new();
    model
        .expect_predict()
        .returning(move |features| Ok(vec![price; features.n_rows()]));
    model
}

/// Mock that must never be called
pub fn unused_model() -> MockModel {
    let mut model = MockModel::new();
    model.expect_predict().never();
    model
}
