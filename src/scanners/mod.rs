// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Cloud Posture Scanners
 * Multi-cloud misconfiguration detection
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

// AWS Scanners
pub mod aws_s3;
pub mod aws_ecr;
pub mod aws_guardduty;
pub mod aws_opensearch;
pub mod aws_backup;
pub mod aws_organizations;
pub mod aws_cloudfront;
pub mod aws_apigateway;
pub mod aws_eks;
pub mod aws_ec2;

// Azure Scanners
pub mod azure_keyvault;
pub mod azure_entra;
pub mod azure_appservice;
pub mod azure_storage;
pub mod azure_vm;

// AWS Exports
pub use aws_s3::AwsS3Scanner;
pub use aws_ecr::AwsEcrScanner;
pub use aws_guardduty::AwsGuardDutyScanner;
pub use aws_opensearch::AwsOpenSearchScanner;
pub use aws_backup::AwsBackupScanner;
pub use aws_organizations::AwsOrganizationsScanner;
pub use aws_cloudfront::AwsCloudFrontScanner;
pub use aws_apigateway::AwsApiGatewayScanner;
pub use aws_eks::AwsEksScanner;
pub use aws_ec2::AwsEc2Scanner;

// Azure Exports
pub use azure_keyvault::AzureKeyVaultScanner;
pub use azure_entra::AzureEntraScanner;
pub use azure_appservice::AzureAppServiceScanner;
pub use azure_storage::AzureStorageScanner;
pub use azure_vm::AzureVmScanner;
