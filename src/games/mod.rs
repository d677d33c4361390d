pub mod baskets;
