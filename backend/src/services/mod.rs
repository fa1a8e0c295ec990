pub mod checkout;
pub mod seeder;
