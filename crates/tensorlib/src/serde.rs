use crate::{allocator::TensorAllocator, shape::Shape, storage::TensorStorage, Tensor};

use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::Deserialize;

impl<T, const N: usize, A> serde::Serialize for Tensor<T, N, A>
where
    T: serde::Serialize,
    A: TensorAllocator,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Tensor", 2)?;
        state.serialize_field("extents", &self.extents().to_vec())?;
        state.serialize_field("data", self.as_slice())?;
        state.end()
    }
}

impl<'de, T, const N: usize, A: TensorAllocator + Default> serde::Deserialize<'de>
    for Tensor<T, N, A>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TensorData<T> {
            extents: Vec<usize>,
            data: Vec<T>,
        }

        let TensorData { extents, data } = TensorData::deserialize(deserializer)?;

        let extents: [usize; N] = extents.try_into().map_err(|e: Vec<usize>| {
            D::Error::custom(format!("expected {N} extents, got {}", e.len()))
        })?;
        let shape = Shape::new(extents).map_err(D::Error::custom)?;
        if shape.numel() != data.len() {
            return Err(D::Error::custom(format!(
                "expected {} elements, got {}",
                shape.numel(),
                data.len()
            )));
        }
        let storage = TensorStorage::from_vec(data, A::default()).map_err(D::Error::custom)?;

        Ok(Tensor::from_parts(shape, storage))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Tensor2, Tensor3};

    #[test]
    fn test_serde() -> Result<(), Box<dyn std::error::Error>> {
        let tensor = Tensor2::<u8>::from_shape_vec([2, 3], vec![1, 2, 3, 4, 5, 6])?;
        let serialized = serde_json::to_string(&tensor)?;
        assert_eq!(serialized, r#"{"extents":[2,3],"data":[1,2,3,4,5,6]}"#);
        let deserialized: Tensor2<u8> = serde_json::from_str(&serialized)?;
        assert_eq!(tensor, deserialized);
        Ok(())
    }

    #[test]
    fn test_serde_rejects_invalid_input() {
        let wrong_rank = r#"{"extents":[2,3],"data":[1,2,3,4,5,6]}"#;
        assert!(serde_json::from_str::<Tensor3<u8>>(wrong_rank).is_err());

        let zero_extent = r#"{"extents":[0,3],"data":[]}"#;
        assert!(serde_json::from_str::<Tensor2<u8>>(zero_extent).is_err());

        let short_data = r#"{"extents":[2,2],"data":[1,2,3]}"#;
        assert!(serde_json::from_str::<Tensor2<u8>>(short_data).is_err());
    }
}
