/// One deterministic generation step: same input, same output.
pub trait Layer<I, O> {
    fn generate(&self, input: I) -> O;
}
