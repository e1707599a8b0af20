mod class_builder;
mod test_class_path;
mod test_programs;
