use crate::{allocator::TensorAllocator, shape::Shape, storage::TensorStorage, Tensor};

impl<T, const N: usize, A> bincode::enc::Encode for Tensor<T, N, A>
where
    T: bincode::enc::Encode,
    A: TensorAllocator,
{
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        bincode::Encode::encode(self.extents(), encoder)?;
        bincode::Encode::encode(self.as_slice(), encoder)?;
        Ok(())
    }
}

impl<T, const N: usize, A, C> bincode::de::Decode<C> for Tensor<T, N, A>
where
    T: bincode::de::Decode<C>,
    A: TensorAllocator + Default,
{
    fn decode<D: bincode::de::Decoder<Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        let extents: [usize; N] = bincode::Decode::decode(decoder)?;
        let data: Vec<T> = bincode::Decode::decode(decoder)?;
        let shape = Shape::new(extents)
            .map_err(|e| bincode::error::DecodeError::OtherString(e.to_string()))?;
        if shape.numel() != data.len() {
            return Err(bincode::error::DecodeError::OtherString(format!(
                "expected {} elements, got {}",
                shape.numel(),
                data.len()
            )));
        }
        let storage = TensorStorage::from_vec(data, A::default())
            .map_err(|e| bincode::error::DecodeError::OtherString(format!("Storage error: {e}")))?;
        Ok(Tensor::from_parts(shape, storage))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Tensor1, Tensor2};

    #[test]
    fn test_bincode() -> Result<(), Box<dyn std::error::Error>> {
        let tensor = Tensor2::<u8>::from_shape_vec([2, 3], vec![1, 2, 3, 4, 5, 6])?;
        let mut serialized = vec![0u8; 100];
        let config = bincode::config::standard();
        let length = bincode::encode_into_slice(&tensor, &mut serialized, config)?;
        let deserialized: (Tensor2<u8>, usize) =
            bincode::decode_from_slice(&serialized[..length], config)?;
        assert_eq!(tensor, deserialized.0);
        Ok(())
    }

    #[test]
    fn test_bincode_rejects_short_data() -> Result<(), Box<dyn std::error::Error>> {
        let config = bincode::config::standard();
        // a rank-1 tensor claiming 4 elements followed by only 3
        let encoded = bincode::encode_to_vec((4usize, vec![1u8, 2, 3]), config)?;
        let decoded: Result<(Tensor1<u8>, usize), _> =
            bincode::decode_from_slice(&encoded, config);
        assert!(decoded.is_err());
        Ok(())
    }
}
